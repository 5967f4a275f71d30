// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Externally visible origin of a request, honoring reverse-proxy headers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use super::AppState;
use crate::model::PublicOrigin;

const FORWARDED_PROTO: &str = "x-forwarded-proto";
const FORWARDED_HOST: &str = "x-forwarded-host";
const FORWARDED_SERVER: &str = "x-forwarded-server";
const FALLBACK_HOST: &str = "localhost";

/// Origin the client used to reach us.
///
/// A configured public origin wins; otherwise the forwarding headers, then `Host`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin(pub PublicOrigin);

impl FromRequestParts<AppState> for RequestOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(match state.public_origin() {
            Some(origin) => origin.clone(),
            None => origin_from_headers(&parts.headers),
        }))
    }
}

pub fn origin_from_headers(headers: &HeaderMap) -> PublicOrigin {
    let scheme = first_value(headers, FORWARDED_PROTO).unwrap_or("http");
    let host = first_value(headers, FORWARDED_HOST)
        .or_else(|| first_value(headers, FORWARDED_SERVER))
        .or_else(|| first_value(headers, HOST.as_str()))
        .unwrap_or(FALLBACK_HOST);
    PublicOrigin::new(scheme, host)
}

/// First entry of a possibly comma-joined header (proxies append their own hop).
fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .map(str::trim)
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};
    use rstest::rstest;

    use super::origin_from_headers;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[rstest]
    #[case(&[("host", "localhost:5000")], "http://localhost:5000")]
    #[case(&[("host", "localhost:5000"), ("x-forwarded-proto", "https")], "https://localhost:5000")]
    #[case(
        &[("host", "127.0.0.1:5000"), ("x-forwarded-proto", "https"), ("x-forwarded-host", "abc.ngrok.app")],
        "https://abc.ngrok.app"
    )]
    #[case(&[("host", "internal"), ("x-forwarded-server", "edge.example")], "http://edge.example")]
    #[case(&[("x-forwarded-proto", "https, http"), ("x-forwarded-host", "a.example, b.internal")], "https://a.example")]
    #[case(&[], "http://localhost")]
    fn origin_prefers_forwarded_headers(
        #[case] pairs: &[(&'static str, &'static str)],
        #[case] expected: &str,
    ) {
        assert_eq!(origin_from_headers(&headers(pairs)).to_string(), expected);
    }
}
