//! Plain-text preface written ahead of the raw console capture.

use chrono::{DateTime, TimeZone};

/// Width of the banner lines.
pub const BANNER_WIDTH: usize = 80;

/// Heading of the additional-information block.
pub const ADDITIONAL_INFO_HEADING: &str = "\nAddition data\n";

/// Render the session banner for a capture started at `at`.
///
/// ```text
/// \n-----...-----\n
/// ----- New loading process at Sat Oct 17 12:00:00 2026 -----
/// \n-----...-----\n
/// ```
pub fn render<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let rule = format!("\n{}\n", "-".repeat(BANNER_WIDTH));
    let title = format!("New loading process at {}", at.format("%a %b %e %H:%M:%S %Y"));

    let free = BANNER_WIDTH.saturating_sub(title.len());
    let left = (free / 2).saturating_sub(1);
    let right = (free - free / 2).saturating_sub(1);

    format!(
        "{rule}{} {title} {}{rule}",
        "-".repeat(left),
        "-".repeat(right)
    )
}

/// Render the additional-information block from metadata lines.
pub fn additional_info(lines: &[String]) -> String {
    let mut text = String::from(ADDITIONAL_INFO_HEADING);
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}
