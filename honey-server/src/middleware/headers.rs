//! Response header scrubbing

use axum::http::header;
use axum::response::Response;

/// Drop the `Allow` header axum adds to method-fallback responses, so a
/// wrong method on a real route looks the same as an unknown path.
pub async fn strip_allow(mut response: Response) -> Response {
    response.headers_mut().remove(header::ALLOW);
    response
}
