//! Login callback parsing.
//!
//! After the login backend finishes the authorization dance it redirects
//! back to the client root carrying either
//! `access_token`, `refresh_token` and `expires_in`, or `error=<reason>`.
//! Parameters may arrive in the query string or in the fragment; when both
//! carry the same name the query wins.

use chrono::{DateTime, Utc};
use url::form_urlencoded;
use url::Url;

use crate::error::{AuthError, Result};
use crate::types::Token;

pub const PARAM_ACCESS_TOKEN: &str = "access_token";
pub const PARAM_REFRESH_TOKEN: &str = "refresh_token";
pub const PARAM_EXPIRES_IN: &str = "expires_in";
pub const PARAM_ERROR: &str = "error";

/// Lifetime assumed when the callback omits `expires_in`.
pub const DEFAULT_CALLBACK_EXPIRES_IN: i64 = 3600;

const CALLBACK_PARAMS: [&str; 4] = [
    PARAM_ACCESS_TOKEN,
    PARAM_REFRESH_TOKEN,
    PARAM_EXPIRES_IN,
    PARAM_ERROR,
];

/// What the current URL says about a login that just completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The backend handed over tokens.
    Tokens(Token),
    /// The backend reported a failure (`error=<reason>`).
    Denied(String),
    /// The URL carries no callback parameters.
    None,
}

#[derive(Default)]
struct CallbackParams {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
    error: Option<String>,
}

impl CallbackParams {
    /// Record `(key, value)` unless the key was already seen.
    fn absorb(&mut self, key: &str, value: String) {
        let slot = match key {
            PARAM_ACCESS_TOKEN => &mut self.access_token,
            PARAM_REFRESH_TOKEN => &mut self.refresh_token,
            PARAM_EXPIRES_IN => &mut self.expires_in,
            PARAM_ERROR => &mut self.error,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn is_empty(&self) -> bool {
        self.access_token.is_none()
            && self.refresh_token.is_none()
            && self.expires_in.is_none()
            && self.error.is_none()
    }
}

/// Interpret the callback parameters in `url`. Tokens are stamped as issued
/// at `now`.
///
/// # Errors
///
/// [`AuthError::InvalidCallback`] when the URL carries token parameters that
/// do not describe a usable token (missing or empty access token,
/// non-numeric or non-positive `expires_in`). A URL that cannot be parsed
/// carries no callback.
///
/// # Examples
///
/// ```
/// use core_auth::callback::{parse_callback, CallbackOutcome};
///
/// let outcome = parse_callback(
///     "http://localhost:3000/?access_token=abc&expires_in=3600&refresh_token=xyz",
///     chrono::Utc::now(),
/// )
/// .unwrap();
///
/// match outcome {
///     CallbackOutcome::Tokens(token) => assert_eq!(token.expires_in, 3600),
///     other => panic!("unexpected outcome: {:?}", other),
/// }
/// ```
pub fn parse_callback(url: &str, now: DateTime<Utc>) -> Result<CallbackOutcome> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return Ok(CallbackOutcome::None),
    };

    let mut params = CallbackParams::default();
    for (key, value) in parsed.query_pairs() {
        params.absorb(&key, value.into_owned());
    }
    if let Some(fragment) = parsed.fragment() {
        for (key, value) in form_urlencoded::parse(fragment.as_bytes()) {
            params.absorb(&key, value.into_owned());
        }
    }

    if params.is_empty() {
        return Ok(CallbackOutcome::None);
    }

    if let Some(reason) = params.error {
        let reason = if reason.trim().is_empty() {
            "unknown_error".to_string()
        } else {
            reason
        };
        return Ok(CallbackOutcome::Denied(reason));
    }

    let access_token = params
        .access_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AuthError::InvalidCallback("missing access_token".to_string()))?;

    let expires_in = match params.expires_in {
        Some(raw) => {
            let secs: i64 = raw.trim().parse().map_err(|_| {
                AuthError::InvalidCallback(format!("expires_in is not a number: {:?}", raw))
            })?;
            if secs <= 0 {
                return Err(AuthError::InvalidCallback(format!(
                    "expires_in must be positive, got {}",
                    secs
                )));
            }
            secs
        }
        None => DEFAULT_CALLBACK_EXPIRES_IN,
    };

    Ok(CallbackOutcome::Tokens(Token::new(
        access_token,
        now,
        expires_in,
        params.refresh_token,
    )))
}

/// `encoded` minus its callback parameters. `None` when nothing was removed;
/// `Some(None)` when nothing is left. Remaining pairs are kept verbatim.
fn without_callback_params(encoded: &str) -> Option<Option<String>> {
    let is_callback = |segment: &str| {
        form_urlencoded::parse(segment.as_bytes())
            .next()
            .is_some_and(|(key, _)| CALLBACK_PARAMS.contains(&&*key))
    };

    let segments: Vec<&str> = encoded.split('&').collect();
    if !segments.iter().any(|segment| is_callback(segment)) {
        return None;
    }

    let kept: Vec<&str> = segments
        .into_iter()
        .filter(|segment| !segment.is_empty() && !is_callback(segment))
        .collect();

    if kept.is_empty() {
        Some(None)
    } else {
        Some(Some(kept.join("&")))
    }
}

/// `url` with every callback parameter removed from its query and fragment.
///
/// Unrelated parameters are preserved. A query or fragment left empty is
/// removed entirely. Unparseable input is returned unchanged.
///
/// ```
/// use core_auth::callback::strip_callback_params;
///
/// assert_eq!(
///     strip_callback_params("http://localhost:3000/?access_token=abc&expires_in=3600"),
///     "http://localhost:3000/"
/// );
/// assert_eq!(
///     strip_callback_params("http://localhost:3000/?tab=tracks&access_token=abc"),
///     "http://localhost:3000/?tab=tracks"
/// );
/// ```
pub fn strip_callback_params(url: &str) -> String {
    let mut parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return url.to_string(),
    };

    if let Some(query) = parsed.query().map(str::to_owned) {
        if let Some(rewritten) = without_callback_params(&query) {
            parsed.set_query(rewritten.as_deref());
        }
    }

    if let Some(fragment) = parsed.fragment().map(str::to_owned) {
        if let Some(rewritten) = without_callback_params(&fragment) {
            parsed.set_fragment(rewritten.as_deref());
        }
    }

    parsed.to_string()
}
