//! Security headers middleware.
//!
//! The storefront serves JSON and uploaded images only, so the policy is as
//! tight as a browser allows: nothing may be framed, scripted or embedded.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// Path prefix of uploaded media, which may be cached.
const MEDIA_PREFIX: &str = "/media/";

const CSP: &str = "default-src 'none'; img-src 'self'; frame-ancestors 'none'; \
                   base-uri 'none'; form-action 'self'";

const PERMISSIONS_POLICY: &str = "accelerometer=(), camera=(), geolocation=(), gyroscope=(), \
     magnetometer=(), microphone=(), payment=(), usb=(), interest-cohort=()";

/// Add security headers to all responses.
///
/// Responses under `/media/` keep their caching headers; everything else is
/// marked `no-store` since most bodies carry session-specific data.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let cacheable = request.uri().path().starts_with(MEDIA_PREFIX);
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(CSP));
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(PERMISSIONS_POLICY),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );

    if !cacheable {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    response
}
