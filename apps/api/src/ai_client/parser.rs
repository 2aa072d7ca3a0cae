//! Response Parser — sequential section extractor for semi-structured model output.
//!
//! Each operation declares its layout as data: an ordered, fixed-size list of
//! literal anchors. The extractor walks the anchors in order and each search
//! starts after the previous anchor, so sections must appear in the declared
//! order. The parse functions decide how each body is read.
//!
//! A missing anchor is a `ParseError` for both operations. There is no
//! degraded fallback; the retry controller decides whether to try again.

use thiserror::Error;

use crate::ai_client::Operation;

pub const TITLE_ANCHOR: &str = "Experience Title:";
pub const BULLETS_ANCHOR: &str = "Resume Bullet Points:";
pub const SKILLS_ANCHOR: &str = "Skills:";
pub const QUESTIONS_ANCHOR: &str = "Follow-Up Questions:";
pub const FINAL_BULLETS_ANCHOR: &str = "Final Bullet Points:";
pub const UPDATED_SKILLS_ANCHOR: &str = "Updated Skills:";
pub const SUGGESTIONS_ANCHOR: &str = "Suggestions:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{operation} response is missing the '{anchor}' section")]
    MissingSection {
        operation: Operation,
        anchor: &'static str,
    },
}

/// The expected sections of one operation's response, in order.
#[derive(Debug, Clone, Copy)]
pub struct ResponseLayout<const N: usize> {
    pub operation: Operation,
    pub anchors: [&'static str; N],
}

pub const INITIAL_LAYOUT: ResponseLayout<4> = ResponseLayout {
    operation: Operation::GenerateInitial,
    anchors: [TITLE_ANCHOR, BULLETS_ANCHOR, SKILLS_ANCHOR, QUESTIONS_ANCHOR],
};

pub const REFINEMENT_LAYOUT: ResponseLayout<3> = ResponseLayout {
    operation: Operation::RefineBullets,
    anchors: [FINAL_BULLETS_ANCHOR, UPDATED_SKILLS_ANCHOR, SUGGESTIONS_ANCHOR],
};

/// Splits `raw` into the raw bodies under each anchor of `layout`, in order.
pub fn extract_sections<'a, const N: usize>(
    raw: &'a str,
    layout: &ResponseLayout<N>,
) -> Result<[&'a str; N], ParseError> {
    // (anchor_start, body_start) for each section, found left to right.
    let mut spans = [(0usize, 0usize); N];
    let mut cursor = 0;

    for (span, anchor) in spans.iter_mut().zip(layout.anchors) {
        let found = raw[cursor..]
            .find(anchor)
            .ok_or(ParseError::MissingSection {
                operation: layout.operation,
                anchor,
            })?;
        let anchor_start = cursor + found;
        cursor = anchor_start + anchor.len();
        *span = (anchor_start, cursor);
    }

    Ok(std::array::from_fn(|i| {
        let end = spans.get(i + 1).map(|next| next.0).unwrap_or(raw.len());
        &raw[spans[i].1..end]
    }))
}

/// First non-empty line only.
fn single_line(body: &str) -> String {
    body.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// One item per line, list markers stripped.
fn list_lines(body: &str) -> Vec<String> {
    clean_lines(body, strip_list_marker)
}

/// Like `list_lines`, also stripping leading "1." / "2)" enumerators.
fn numbered_lines(body: &str) -> Vec<String> {
    clean_lines(body, |l| strip_enumerator(strip_list_marker(l)))
}

fn clean_lines(body: &str, clean: impl Fn(&str) -> &str) -> Vec<String> {
    body.lines()
        .map(|l| clean(l).trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strips leading "- ", "• " and "* " list markers plus surrounding whitespace.
fn strip_list_marker(line: &str) -> &str {
    let line = line
        .trim()
        .trim_start_matches(|c: char| c == '-' || c == '•' || c.is_whitespace());
    line.strip_prefix("* ").unwrap_or(line).trim()
}

/// Strips a leading "1." / "2)" style enumerator.
fn strip_enumerator(line: &str) -> &str {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return line;
    }
    let rest = &line[digits..];
    match rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
        Some(after) => after.trim_start(),
        None => line,
    }
}

/// Typed sections of an initial-generation response, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInitial {
    pub title: String,
    pub bullets: Vec<String>,
    pub skills: Vec<String>,
    pub questions: Vec<String>,
}

/// Typed sections of a refinement response, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRefinement {
    pub bullets: Vec<String>,
    pub skills: Vec<String>,
    pub suggestions: String,
}

pub fn parse_initial(raw: &str) -> Result<ParsedInitial, ParseError> {
    let [title, bullets, skills, questions] = extract_sections(raw, &INITIAL_LAYOUT)?;

    Ok(ParsedInitial {
        title: single_line(title),
        bullets: list_lines(bullets),
        skills: list_lines(skills),
        questions: numbered_lines(questions),
    })
}

pub fn parse_refinement(raw: &str) -> Result<ParsedRefinement, ParseError> {
    let [bullets, skills, suggestions] = extract_sections(raw, &REFINEMENT_LAYOUT)?;

    Ok(ParsedRefinement {
        bullets: list_lines(bullets),
        skills: list_lines(skills),
        suggestions: suggestions.trim().to_string(),
    })
}
