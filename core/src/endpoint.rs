//! Declarative description of one API operation.
//!
//! An `EndpointDescriptor` names a method, a path template with `{name}`
//! placeholders, and an ordered list of parameters. Where a parameter ends up
//! in a request is derived from the descriptor's structure, never from a flag
//! on the parameter:
//!
//! - a name that matches a placeholder is a path parameter;
//! - otherwise, for methods without a body (GET, DELETE), a query parameter;
//! - otherwise a body parameter, unless the name is one of
//!   [`RESERVED_QUERY_NAMES`], which always stay in the query string.

use serde::{Deserialize, Serialize};

use crate::error::EndpointError;
use crate::http::HttpMethod;

/// Pagination and filter names that are never sent in a JSON body.
pub const RESERVED_QUERY_NAMES: [&str; 8] =
    ["limit", "offset", "sort", "order", "q", "type", "tags", "status"];

pub fn is_reserved_query_name(name: &str) -> bool {
    RESERVED_QUERY_NAMES.contains(&name)
}

/// Declared type of a parameter. Informational only; values travel as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }
}

/// Which credential an endpoint accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthRequirement {
    #[default]
    None,
    Jwt,
    ApiKey,
    /// Either a JWT or an API key.
    Both,
}

impl AuthRequirement {
    pub fn requires_token(&self) -> bool {
        !matches!(self, AuthRequirement::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

impl ParameterSpec {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }
}

/// Where a parameter's value is placed in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub id: String,
    pub method: HttpMethod,
    /// Path relative to the API base URL, e.g. `/posts/{id}/vote`.
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub auth: AuthRequirement,
}

impl EndpointDescriptor {
    pub fn new(id: &str, method: HttpMethod, path: &str) -> Self {
        Self {
            id: id.to_string(),
            method,
            path: path.to_string(),
            description: String::new(),
            parameters: Vec::new(),
            auth: AuthRequirement::None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_param(mut self, param: ParameterSpec) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_auth(mut self, auth: AuthRequirement) -> Self {
        self.auth = auth;
        self
    }

    /// Placeholder names in template order. Empty if the template is malformed.
    pub fn placeholders(&self) -> Vec<&str> {
        scan_placeholders(&self.path).unwrap_or_default()
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn location_of(&self, name: &str) -> ParamLocation {
        if self.placeholders().contains(&name) {
            ParamLocation::Path
        } else if !self.method.has_body() || is_reserved_query_name(name) {
            ParamLocation::Query
        } else {
            ParamLocation::Body
        }
    }

    /// Parameters placed at `location`, in declaration order.
    pub fn parameters_in(&self, location: ParamLocation) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters
            .iter()
            .filter(move |p| self.location_of(&p.name) == location)
    }

    /// Check the template against the declared parameters.
    ///
    /// Every placeholder must be unique and backed by a required parameter,
    /// and parameter names must be unique.
    pub fn validate(&self) -> Result<(), EndpointError> {
        let placeholders = scan_placeholders(&self.path)?;

        for (i, name) in placeholders.iter().enumerate() {
            if placeholders[..i].contains(name) {
                return Err(EndpointError::DuplicatePlaceholder {
                    path: self.path.clone(),
                    name: name.to_string(),
                });
            }
            match self.parameter(name) {
                None => {
                    return Err(EndpointError::UndeclaredPlaceholder {
                        path: self.path.clone(),
                        name: name.to_string(),
                    })
                }
                Some(param) if !param.required => {
                    return Err(EndpointError::OptionalPathParameter {
                        path: self.path.clone(),
                        name: name.to_string(),
                    })
                }
                Some(_) => {}
            }
        }

        for (i, param) in self.parameters.iter().enumerate() {
            if self.parameters[..i].iter().any(|p| p.name == param.name) {
                return Err(EndpointError::DuplicateParameter {
                    path: self.path.clone(),
                    name: param.name.clone(),
                });
            }
        }
        Ok(())
    }
}

fn scan_placeholders(path: &str) -> Result<Vec<&str>, EndpointError> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .filter(|close| !after[..*close].contains('{'))
            .ok_or_else(|| EndpointError::UnterminatedPlaceholder {
                path: path.to_string(),
            })?;
        let name = &after[..close];
        if name.is_empty() {
            return Err(EndpointError::EmptyPlaceholder {
                path: path.to_string(),
            });
        }
        names.push(name);
        rest = &after[close + 1..];
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote() -> EndpointDescriptor {
        EndpointDescriptor::new("vote", HttpMethod::Post, "/posts/{id}/vote")
            .with_param(ParameterSpec::required("id", ParamType::String, "Post ID"))
            .with_param(ParameterSpec::required("direction", ParamType::String, "up or down"))
            .with_param(ParameterSpec::optional("status", ParamType::String, "filter"))
            .with_auth(AuthRequirement::Both)
    }

    #[test]
    fn placeholders_in_template_order() {
        let ep = EndpointDescriptor::new("x", HttpMethod::Get, "/problems/{id}/approaches/{approachId}/history");
        assert_eq!(ep.placeholders(), vec!["id", "approachId"]);
    }

    #[test]
    fn classification_is_structural() {
        let ep = vote();
        assert_eq!(ep.location_of("id"), ParamLocation::Path);
        assert_eq!(ep.location_of("direction"), ParamLocation::Body);
        assert_eq!(ep.location_of("status"), ParamLocation::Query);
    }

    #[test]
    fn get_parameters_are_query() {
        let ep = EndpointDescriptor::new("search", HttpMethod::Get, "/search")
            .with_param(ParameterSpec::required("q", ParamType::String, ""))
            .with_param(ParameterSpec::optional("author", ParamType::String, ""));
        let query: Vec<_> = ep.parameters_in(ParamLocation::Query).map(|p| p.name.as_str()).collect();
        assert_eq!(query, vec!["q", "author"]);
        assert_eq!(ep.parameters_in(ParamLocation::Body).count(), 0);
    }

    #[test]
    fn delete_has_no_body_parameters() {
        let ep = EndpointDescriptor::new("del", HttpMethod::Delete, "/posts/{id}")
            .with_param(ParameterSpec::required("id", ParamType::String, ""))
            .with_param(ParameterSpec::optional("reason", ParamType::String, ""));
        assert_eq!(ep.location_of("reason"), ParamLocation::Query);
    }

    #[test]
    fn valid_descriptor_passes() {
        assert_eq!(vote().validate(), Ok(()));
    }

    #[test]
    fn undeclared_placeholder_is_rejected() {
        let ep = EndpointDescriptor::new("x", HttpMethod::Get, "/posts/{id}");
        assert!(matches!(
            ep.validate(),
            Err(EndpointError::UndeclaredPlaceholder { name, .. }) if name == "id"
        ));
    }

    #[test]
    fn optional_path_parameter_is_rejected() {
        let ep = EndpointDescriptor::new("x", HttpMethod::Get, "/posts/{id}")
            .with_param(ParameterSpec::optional("id", ParamType::String, ""));
        assert!(matches!(ep.validate(), Err(EndpointError::OptionalPathParameter { .. })));
    }

    #[test]
    fn duplicate_placeholder_is_rejected() {
        let ep = EndpointDescriptor::new("x", HttpMethod::Get, "/a/{id}/b/{id}")
            .with_param(ParameterSpec::required("id", ParamType::String, ""));
        assert!(matches!(ep.validate(), Err(EndpointError::DuplicatePlaceholder { .. })));
    }

    #[test]
    fn duplicate_parameter_is_rejected() {
        let ep = EndpointDescriptor::new("x", HttpMethod::Get, "/a")
            .with_param(ParameterSpec::optional("q", ParamType::String, ""))
            .with_param(ParameterSpec::optional("q", ParamType::String, ""));
        assert!(matches!(ep.validate(), Err(EndpointError::DuplicateParameter { .. })));
    }

    #[test]
    fn malformed_templates_are_rejected() {
        let open = EndpointDescriptor::new("x", HttpMethod::Get, "/posts/{id");
        assert!(matches!(open.validate(), Err(EndpointError::UnterminatedPlaceholder { .. })));
        assert!(open.placeholders().is_empty());

        let nested = EndpointDescriptor::new("x", HttpMethod::Get, "/posts/{a{b}");
        assert!(matches!(nested.validate(), Err(EndpointError::UnterminatedPlaceholder { .. })));

        let empty = EndpointDescriptor::new("x", HttpMethod::Get, "/posts/{}");
        assert!(matches!(empty.validate(), Err(EndpointError::EmptyPlaceholder { .. })));
    }

    #[test]
    fn descriptor_deserializes_from_catalog_json() {
        let ep: EndpointDescriptor = serde_json::from_str(
            r#"{
                "id": "get-post",
                "method": "GET",
                "path": "/posts/{id}",
                "parameters": [
                    {"name": "id", "type": "string", "required": true, "description": "Post ID"}
                ],
                "auth": "api_key"
            }"#,
        )
        .unwrap();
        assert_eq!(ep.method, HttpMethod::Get);
        assert_eq!(ep.auth, AuthRequirement::ApiKey);
        assert_eq!(ep.parameters[0].param_type, ParamType::String);
        assert_eq!(ep.validate(), Ok(()));
    }
}
