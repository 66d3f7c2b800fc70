use utoipa::openapi::path::{Parameter, ParameterBuilder, ParameterIn};
use utoipa::openapi::{KnownFormat, ObjectBuilder, Required, SchemaFormat, SchemaType};

use super::{AuthorizationQueryParams as Params, QueryParameters};

fn string_parameter(param: Params, required: Required, description: &str) -> ParameterBuilder {
    ParameterBuilder::new()
        .name(param.name())
        .required(required)
        .parameter_in(ParameterIn::Query)
        .description(Some(description))
        .schema(Some(ObjectBuilder::new().schema_type(SchemaType::String)))
}

impl utoipa::IntoParams for QueryParameters {
    fn into_params(_parameter_in_provider: impl Fn() -> Option<ParameterIn>) -> Vec<Parameter> {
        vec![
            string_parameter(
                Params::ResponseType,
                Required::True,
                "Response type. Forwarded as-is to the authorization service, which decides which flows are supported.",
            )
            .example(Some(serde_json::json!("code")))
            .build(),
            string_parameter(
                Params::ClientId,
                Required::True,
                "Client ID of the application asking for access.",
            )
            .build(),
            ParameterBuilder::new()
                .name(Params::RedirectUri.name())
                .required(Required::True)
                .parameter_in(ParameterIn::Query)
                .description(Some("URI the decision is delivered to. Must match one registered by the client."))
                .schema(Some(
                    ObjectBuilder::new()
                        .schema_type(SchemaType::String)
                        .format(Some(SchemaFormat::KnownFormat(KnownFormat::Uri))),
                ))
                .build(),
            string_parameter(
                Params::Scope,
                Required::False,
                "Scopes to be requested from the user. A space-separated list formatted according to the [RFC](https://datatracker.ietf.org/doc/html/rfc6749#section-3.3).",
            )
            .build(),
            string_parameter(
                Params::State,
                Required::False,
                "Any string. Will be preserved exactly, including on the access_denied redirect.",
            )
            .build(),
            string_parameter(
                Params::CodeChallenge,
                Required::False,
                "PKCE code challenge. Forwarded unmodified.",
            )
            .build(),
            string_parameter(
                Params::CodeChallengeMethod,
                Required::False,
                "PKCE code challenge method. Forwarded unmodified.",
            )
            .build(),
        ]
    }
}
