//! Performance Profile export: renders a profile as a Markdown document.
//!
//! Section order is fixed (1–8). A heading is emitted only when its field has
//! content. The export-date line is the only time-dependent text.

pub mod archive;
pub mod clipboard;
pub mod handlers;

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};

use crate::models::profile::PerformanceProfile;

const MAX_FILENAME_SEGMENT: usize = 50;

const FOOTER: &str = "---\n\n\
*This performance profile defines what success looks like in the role. \
Use it to anchor sourcing, interview design, and candidate evaluation.*\n";

/// Renders `profile` for the job titled `job_title`, dated `exported_on`.
pub fn render_profile_markdown(
    profile: &PerformanceProfile,
    job_title: &str,
    exported_on: NaiveDate,
) -> String {
    let mut md = format!("# Performance Profile: {job_title}\n\n");
    md.push_str(&format!("*Exported on {}*\n\n", exported_on.format("%B %-d, %Y")));
    md.push_str("---\n\n");

    push_list(&mut md, "1. Year 1 Outcomes", &profile.year_1_outcomes);
    push_text(&mut md, "2. Biggest Challenge", profile.biggest_challenge.as_deref());
    push_list(&mut md, "3. Comparable Experience", &profile.comparable_experience);
    push_list(&mut md, "4. Dealbreakers", &profile.dealbreakers);
    push_list(&mut md, "5. Motivation Drivers", &profile.motivation_drivers);

    let must = non_blank(&profile.must_have_requirements);
    let nice = non_blank(&profile.nice_to_have_requirements);
    if !must.is_empty() || !nice.is_empty() {
        md.push_str("## 6. Requirements\n\n");
        if !must.is_empty() {
            md.push_str("### Must Have\n\n");
            push_bullets(&mut md, &must);
        }
        if !nice.is_empty() {
            md.push_str("### Nice to Have\n\n");
            push_bullets(&mut md, &nice);
        }
    }

    push_list(&mut md, "7. Trajectory Patterns", &profile.trajectory_patterns);
    push_text(&mut md, "8. Context Notes", profile.context_notes.as_deref());

    md.push_str(FOOTER);
    md
}

/// Renders with today's date.
pub fn export_profile(profile: &PerformanceProfile, job_title: &str) -> String {
    render_profile_markdown(profile, job_title, Utc::now().date_naive())
}

/// `performance_profile_<sanitized title>.md`
pub fn profile_filename(job_title: &str) -> String {
    format!("performance_profile_{}.md", sanitize_title(job_title))
}

/// Lowercase, every character outside `[a-z0-9]` becomes `_`, at most 50 characters.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '_' })
        .take(MAX_FILENAME_SEGMENT)
        .collect()
}

/// Writes the export into `dir` and returns the file path.
pub async fn write_profile_file(
    dir: &Path,
    job_title: &str,
    markdown: &str,
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(profile_filename(job_title));
    tokio::fs::write(&path, markdown).await?;
    Ok(path)
}

/// Drops whitespace-only items; kept items are rendered exactly as stored.
fn non_blank(items: &[String]) -> Vec<&str> {
    items
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(String::as_str)
        .collect()
}

fn push_list(md: &mut String, heading: &str, items: &[String]) {
    let items = non_blank(items);
    if items.is_empty() {
        return;
    }
    md.push_str(&format!("## {heading}\n\n"));
    push_bullets(md, &items);
}

fn push_bullets(md: &mut String, items: &[&str]) {
    for item in items {
        md.push_str(&format!("- {item}\n"));
    }
    md.push('\n');
}

fn push_text(md: &mut String, heading: &str, text: Option<&str>) {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return;
    };
    md.push_str(&format!("## {heading}\n\n{text}\n\n"));
}
