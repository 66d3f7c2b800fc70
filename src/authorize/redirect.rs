use url::Url;

use super::AuthorizationRequest;

const ACCESS_DENIED: &str = "access_denied";

/// Where to send the user after they refused access: the client's
/// `redirect_uri`, its own query preserved, with `error=access_denied` and
/// the request's `state` appended.
pub fn access_denied(request: &AuthorizationRequest) -> Result<Url, url::ParseError> {
    let mut redirect_uri = Url::parse(request.redirect_uri())?;

    {
        let mut query = redirect_uri.query_pairs_mut();
        query.append_pair("error", ACCESS_DENIED);
        if let Some(state) = request.state() {
            query.append_pair("state", state);
        }
    }

    Ok(redirect_uri)
}
