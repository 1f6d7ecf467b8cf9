//! Page access rules.
//!
//! `/` is the sign-in page and is only for visitors without a session; the
//! other pages need one. A request on the wrong side of the rule is sent to
//! the page it belongs on.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    Landing,
    Dashboard,
    ReportFound,
    ReportLost,
}

impl Page {
    pub const ALL: [Page; 4] = [
        Page::Landing,
        Page::Dashboard,
        Page::ReportFound,
        Page::ReportLost,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Page::Landing => "/",
            Page::Dashboard => "/dashboard",
            Page::ReportFound => "/report-found",
            Page::ReportLost => "/report-lost",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Landing => "Sign in",
            Page::Dashboard => "Lost & Found Feed",
            Page::ReportFound => "Report a Found Item",
            Page::ReportLost => "Report a Lost Item",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|page| page.path() == path)
    }

    pub fn requires_session(&self) -> bool {
        !matches!(self, Page::Landing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Page),
    Redirect(&'static str),
}

pub fn decide(page: Page, signed_in: bool) -> Navigation {
    match (page.requires_session(), signed_in) {
        (false, true) => Navigation::Redirect(Page::Dashboard.path()),
        (true, false) => Navigation::Redirect(Page::Landing.path()),
        _ => Navigation::Render(page),
    }
}
