//! Usage: OAuth popup provider definitions (provider ids and fixed scope sets).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProviderKey {
    Google,
    Github,
}

impl OAuthProviderKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }

    pub const fn config(self) -> OAuthProviderConfig {
        match self {
            Self::Google => GOOGLE_CONFIG,
            Self::Github => GITHUB_CONFIG,
        }
    }

    /// Operation context used for error reporting (`google_sign_in`).
    pub const fn sign_in_context(self) -> &'static str {
        match self {
            Self::Google => "google_sign_in",
            Self::Github => "github_sign_in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OAuthProviderConfig {
    pub key: OAuthProviderKey,
    /// Provider id as reported back by the identity backend.
    pub provider_id: &'static str,
    pub display_name: &'static str,
    pub scopes: &'static [&'static str],
}

pub const GOOGLE_CONFIG: OAuthProviderConfig = OAuthProviderConfig {
    key: OAuthProviderKey::Google,
    provider_id: "google.com",
    display_name: "Google",
    scopes: &[
        "https://www.googleapis.com/auth/userinfo.email",
        "https://www.googleapis.com/auth/userinfo.profile",
    ],
};

pub const GITHUB_CONFIG: OAuthProviderConfig = OAuthProviderConfig {
    key: OAuthProviderKey::Github,
    provider_id: "github.com",
    display_name: "GitHub",
    scopes: &["user:email", "read:user"],
};
