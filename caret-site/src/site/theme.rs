//! Light/dark theme preference.
//!
//! The theme is resolved once per request (cookie, then the configured
//! default) and handed to templates as a plain value.

use axum_extra::extract::CookieJar;

/// Cookie holding the visitor's theme choice
pub const THEME_COOKIE: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn from_dark_mode(dark_mode: bool) -> Self {
        if dark_mode { Theme::Dark } else { Theme::Light }
    }

    /// Theme from the visitor's cookie, falling back to the site default.
    pub fn resolve(jar: &CookieJar, default: Theme) -> Self {
        jar.get(THEME_COOKIE)
            .and_then(|c| Self::parse(c.value()))
            .unwrap_or(default)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }

    /// `Set-Cookie` value persisting this theme for a year.
    pub fn cookie(self) -> String {
        format!(
            "{THEME_COOKIE}={}; Path=/; Max-Age=31536000; SameSite=Lax",
            self.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Cookie;

    #[test]
    fn test_resolve() {
        let empty = CookieJar::new();
        assert_eq!(Theme::resolve(&empty, Theme::Dark), Theme::Dark);

        let light = CookieJar::new().add(Cookie::new(THEME_COOKIE, "light"));
        assert_eq!(Theme::resolve(&light, Theme::Dark), Theme::Light);

        let junk = CookieJar::new().add(Cookie::new(THEME_COOKIE, "purple"));
        assert_eq!(Theme::resolve(&junk, Theme::Light), Theme::Light);
    }

    #[test]
    fn test_toggle_and_cookie() {
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(
            Theme::Light.cookie(),
            "theme=light; Path=/; Max-Age=31536000; SameSite=Lax"
        );
    }
}
