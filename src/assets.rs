//! Bundled icon assets

/// Icons shipped with the extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Trigger,
    Generate,
    Regenerate,
    Insert,
    Clear,
}

impl Icon {
    /// Logical asset name inside the extension bundle
    pub fn asset(self) -> &'static str {
        match self {
            Icon::Trigger => "icon/Vector.svg",
            Icon::Generate => "icon/Arrow-icon.svg",
            Icon::Regenerate => "icon/regenerate-icon.svg",
            Icon::Insert => "icon/insert-icon.svg",
            Icon::Clear => "icon/cross-icon.svg",
        }
    }

    pub fn alt(self) -> &'static str {
        match self {
            Icon::Trigger => "AI Icon",
            Icon::Generate => "Generate Icon",
            Icon::Regenerate => "Regenerate Icon",
            Icon::Insert => "Insert Icon",
            Icon::Clear => "Clear Icon",
        }
    }

    /// Full URL given the extension's asset base
    pub fn url(self, base: &str) -> String {
        if base.is_empty() {
            return self.asset().to_string();
        }
        format!("{}/{}", base.trim_end_matches('/'), self.asset())
    }
}
