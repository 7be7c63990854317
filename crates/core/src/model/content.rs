use thiserror::Error;
use url::Url;

use crate::schedule::FINAL_STEP;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("step must be in 1..=50, got {provided}")]
    StepOutOfRange { provided: u8 },

    #[error("article title cannot be empty")]
    EmptyTitle,

    #[error("invalid url: {raw}")]
    InvalidUrl { raw: String },
}

fn check_step(step: u8) -> Result<(), ContentError> {
    if step == 0 || step > FINAL_STEP {
        return Err(ContentError::StepOutOfRange { provided: step });
    }
    Ok(())
}

fn parse_url(raw: &str) -> Result<Url, ContentError> {
    Url::parse(raw).map_err(|_| ContentError::InvalidUrl {
        raw: raw.to_owned(),
    })
}

//
// ─── DIARY LINK ────────────────────────────────────────────────────────────────
//

/// Link to the shared diary page for one step.
///
/// Every step has one; the dispatcher attaches it to the hand-off payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiaryLink {
    step: u8,
    url: Url,
}

impl DiaryLink {
    /// Creates a validated diary link.
    ///
    /// # Errors
    ///
    /// Returns an error if the step is outside 1..=50 or the URL does not
    /// parse.
    pub fn new(step: u8, url: &str) -> Result<Self, ContentError> {
        check_step(step)?;
        let url = parse_url(url)?;
        Ok(Self { step, url })
    }

    #[must_use]
    pub fn step(&self) -> u8 {
        self.step
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

//
// ─── ARTICLE ───────────────────────────────────────────────────────────────────
//

/// Companion article attached to one of the early steps.
///
/// Only the first stretch of the program carries articles; later steps have
/// none, which the lookup surfaces as an ordinary `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    step: u8,
    title: String,
    url: Url,
}

impl Article {
    /// Creates a validated article.
    ///
    /// # Errors
    ///
    /// Returns an error if the step is outside 1..=50, the title is empty or
    /// whitespace-only, or the URL does not parse.
    pub fn new(step: u8, title: impl Into<String>, url: &str) -> Result<Self, ContentError> {
        check_step(step)?;
        let title = title.into();
        let title = title.trim();
        if title.is_empty() {
            return Err(ContentError::EmptyTitle);
        }
        let url = parse_url(url)?;
        Ok(Self {
            step,
            title: title.to_owned(),
            url,
        })
    }

    #[must_use]
    pub fn step(&self) -> u8 {
        self.step
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diary_link_happy_path() {
        let link = DiaryLink::new(7, "https://telegra.ph/step-7").unwrap();
        assert_eq!(link.step(), 7);
        assert_eq!(link.url().as_str(), "https://telegra.ph/step-7");
    }

    #[test]
    fn diary_link_rejects_out_of_range_steps() {
        assert_eq!(
            DiaryLink::new(0, "https://example.org").unwrap_err(),
            ContentError::StepOutOfRange { provided: 0 }
        );
        assert_eq!(
            DiaryLink::new(51, "https://example.org").unwrap_err(),
            ContentError::StepOutOfRange { provided: 51 }
        );
    }

    #[test]
    fn diary_link_rejects_junk_url() {
        let err = DiaryLink::new(1, "not a url").unwrap_err();
        assert_eq!(
            err,
            ContentError::InvalidUrl {
                raw: "not a url".into()
            }
        );
    }

    #[test]
    fn article_trims_title() {
        let article = Article::new(2, "  Getting Started  ", "https://telegra.ph/intro").unwrap();
        assert_eq!(article.title(), "Getting Started");
    }

    #[test]
    fn article_rejects_blank_title() {
        let err = Article::new(2, "   ", "https://telegra.ph/intro").unwrap_err();
        assert_eq!(err, ContentError::EmptyTitle);
    }
}
