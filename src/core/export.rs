use super::models::Candidate;

pub const HEADER_COLUMNS: [&str; 19] = [
    "Full Name",
    "Email",
    "Mobile",
    "Date of Birth",
    "Current Company",
    "Designation",
    "Total Experience (Years)",
    "Relevant Experience (Years)",
    "Skills",
    "Current CTC",
    "Expected CTC",
    "Notice Period",
    "Highest Qualification",
    "Education Field",
    "Current Location",
    "File Name",
    "Match Score",
    "Match Reason",
    "Shortlisted",
];

/// Header row followed by one row per candidate, in the given order.
pub fn export_rows(candidates: &[Candidate]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(candidates.len() + 1);
    rows.push(HEADER_COLUMNS.iter().map(|c| c.to_string()).collect());
    rows.extend(candidates.iter().map(candidate_row));
    rows
}

/// Tab-separated rows for pasting into a spreadsheet. Tabs and line breaks
/// inside a cell become a single space so every record stays on one line.
pub fn clipboard_tsv(candidates: &[Candidate]) -> String {
    export_rows(candidates)
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| clipboard_cell(cell))
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn candidate_row(candidate: &Candidate) -> Vec<String> {
    let (score, reason) = match &candidate.match_analysis {
        Some(analysis) => (
            analysis.match_score.to_string(),
            analysis.match_reason.clone(),
        ),
        None => (String::new(), String::new()),
    };

    vec![
        candidate.full_name.clone(),
        candidate.email.clone(),
        candidate.mobile.clone(),
        candidate.date_of_birth.clone(),
        candidate.current_company.clone(),
        candidate.designation.clone(),
        format_years(candidate.total_experience),
        format_years(candidate.relevant_experience),
        candidate.skills.join(", "),
        candidate.current_ctc.clone(),
        candidate.expected_ctc.clone(),
        candidate.notice_period.clone(),
        candidate.highest_qualification.clone(),
        candidate.education_field.clone(),
        candidate.current_location.clone(),
        candidate.file_name.clone(),
        score,
        reason,
        if candidate.is_shortlisted { "Yes" } else { "No" }.to_string(),
    ]
}

fn format_years(years: f64) -> String {
    if years.fract() == 0.0 {
        format!("{years:.0}")
    } else {
        format!("{years:.1}")
    }
}

fn clipboard_cell(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    let mut pending_space = false;
    for ch in cell.chars() {
        if matches!(ch, '\t' | '\n' | '\r') {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    if pending_space {
        out.push(' ');
    }
    out
}
