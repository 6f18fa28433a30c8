use crate::apis::CandidatePaper;

pub const FALLBACK_VENUE: &str = "Top-tier venue";
pub const FALLBACK_LINK: &str = "https://www.semanticscholar.org/";
const MAX_LISTED_AUTHORS: usize = 3;

/// A paper accepted for notification in the current scan.
///
/// `raw_title` is the dedup key and the identifier written to history; all
/// other text fields are for presentation only.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperRecord {
    pub raw_title: String,
    pub display_title: String,
    pub venue: String,
    pub publication_date: String,
    pub authors: Vec<String>,
    pub link: String,
    pub abstract_text: String,
    /// Filled in by the scan after summarization.
    pub ai_summary: String,
}

impl PaperRecord {
    /// Build a record from a candidate. Returns `None` when the candidate has
    /// no usable abstract.
    ///
    /// `fallback_year` is used when the API reports neither a publication
    /// date nor a year.
    pub fn from_candidate(candidate: CandidatePaper, fallback_year: i32) -> Option<Self> {
        let abstract_text = candidate
            .abstract_text
            .filter(|a| !a.trim().is_empty())?;

        let venue = candidate
            .venue
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_VENUE.to_string());
        let year = candidate.year.unwrap_or(fallback_year);
        let publication_date = candidate
            .publication_date
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| year.to_string());

        Some(Self {
            display_title: format!("[{} {}] {}", venue, year, candidate.title),
            raw_title: candidate.title,
            venue,
            publication_date,
            authors: candidate.authors,
            link: candidate
                .url
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_LINK.to_string()),
            abstract_text,
            ai_summary: String::new(),
        })
    }

    pub fn author_line(&self) -> String {
        format_authors(&self.authors)
    }
}

/// Join the first three author names; longer lists end with "et al.".
pub fn format_authors(authors: &[String]) -> String {
    if authors.is_empty() {
        return "Unknown authors".to_string();
    }
    let shown = authors[..authors.len().min(MAX_LISTED_AUTHORS)].join(", ");
    if authors.len() > MAX_LISTED_AUTHORS {
        format!("{} et al.", shown)
    } else {
        shown
    }
}
