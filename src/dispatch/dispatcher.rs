//! Per-request pipeline of a leaf: auth, middlewares, slot validation,
//! handler.

use std::sync::Arc;

use serde_json::Value;

use super::request::{Overlay, RawRequest, RequestView, Validated};
use super::response::Payload;
use crate::error::DispatchError;
use crate::route::{BoundSchema, LeafNode, Slot, SlotBinding};
use crate::schema::ErrorTree;

/// Runs `raw` through `leaf`.
///
/// Auth schemes run first, in declaration order; the first rejection ends
/// the request. Middlewares run next and may contribute overlay keys. Each
/// bound slot is then validated once. The handler is invoked exactly once,
/// and only when everything before it succeeded.
///
/// # Errors
///
/// Returns [`DispatchError::AuthenticationRequired`] when a scheme rejects
/// the request, [`DispatchError::ValidationFailed`] or
/// [`DispatchError::UnionValidationFailed`] when a slot does not validate,
/// and [`DispatchError::Handler`] for errors raised by a middleware or the
/// handler.
pub async fn dispatch(leaf: &LeafNode, raw: RawRequest) -> Result<Payload, DispatchError> {
    let raw = Arc::new(raw);
    let mut overlay = Overlay::default();

    for scheme in &leaf.auth {
        let view = RequestView::new(Arc::clone(&raw), overlay.clone());
        match scheme.validate(&view).await {
            Some(principal) => overlay.merge(principal),
            None => {
                tracing::debug!(
                    scheme = scheme.scheme_name(),
                    path = %leaf.path,
                    "authentication rejected"
                );
                return Err(DispatchError::AuthenticationRequired {
                    scheme: scheme.scheme_name(),
                });
            }
        }
    }

    for middleware in &leaf.middlewares {
        let view = RequestView::new(Arc::clone(&raw), overlay.clone());
        if let Some(contribution) = middleware.apply(&view, leaf).await? {
            overlay.merge(contribution);
        }
    }

    for slot in Slot::ALL {
        let Some(binding) = leaf.slots.get(slot) else {
            continue;
        };
        if slot == Slot::Body
            && let Some(reason) = &raw.body_error
        {
            return Err(DispatchError::ValidationFailed {
                slot,
                errors: ErrorTree::message(reason.clone()),
            });
        }
        let validated = resolve(slot, binding, raw.section(slot)).inspect_err(|err| {
            tracing::debug!(%slot, path = %leaf.path, error = %err, "request rejected");
        })?;
        overlay.set_slot(slot, validated);
    }

    leaf.invoke(RequestView::new(raw, overlay))
        .await
        .map_err(DispatchError::Handler)
}

fn resolve(slot: Slot, binding: &SlotBinding, input: &Value) -> Result<Validated, DispatchError> {
    match binding {
        // A schema-less model validates anything; the typed instance is
        // only available when the input happens to fit it.
        SlotBinding::Single(BoundSchema {
            model,
            schema: None,
        }) => Ok(Validated::new(
            *model,
            input.clone(),
            model.instantiate(input.clone()).ok(),
        )),
        SlotBinding::Single(bound) => {
            try_candidate(bound, input).map_err(|errors| DispatchError::ValidationFailed {
                slot,
                errors,
            })
        }
        SlotBinding::Union(candidates) => {
            let mut merged = ErrorTree::new();
            for bound in candidates {
                match try_candidate(bound, input) {
                    Ok(validated) => return Ok(validated),
                    Err(errors) => merged.merge(errors),
                }
            }
            Err(DispatchError::UnionValidationFailed {
                slot,
                errors: merged,
            })
        }
    }
}

fn try_candidate(bound: &BoundSchema, input: &Value) -> Result<Validated, ErrorTree> {
    let clean = match &bound.schema {
        Some(schema) => schema.parse(input)?,
        None => input.clone(),
    };
    let instance = bound.model.instantiate(clean.clone()).map_err(|err| {
        ErrorTree::message(format!("Invalid {}: {err}", bound.model.name()))
    })?;
    Ok(Validated::new(bound.model, clean, Some(instance)))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::http::{HeaderValue, Method, StatusCode, Uri};
    use serde_json::json;

    use super::*;
    use crate::route::{RouteNode, TreeBuilder};
    use crate::testing::ItemController;

    fn leaf(index: usize) -> Arc<LeafNode> {
        let mut builder = TreeBuilder::new();
        let Ok(nodes) = builder.build::<ItemController>() else {
            panic!("build failed");
        };
        let Some(RouteNode::Leaf(leaf)) = nodes.into_iter().nth(index) else {
            panic!("expected a leaf at {index}");
        };
        leaf
    }

    fn request(method: Method, uri: &'static str) -> RawRequest {
        RawRequest::new(method, Uri::from_static(uri))
    }

    fn body_of(payload: Payload) -> Value {
        payload.into_body()
    }

    #[tokio::test]
    async fn params_reach_the_handler() {
        let mut raw = request(Method::GET, "/items/42");
        raw.params = json!({"id": "42"});
        let Ok(payload) = dispatch(&leaf(0), raw).await else {
            panic!("dispatch failed");
        };
        assert_eq!(body_of(payload), json!({"id": "42"}));
    }

    #[tokio::test]
    async fn handler_errors_pass_through() {
        let mut raw = request(Method::GET, "/items/missing");
        raw.params = json!({"id": "missing"});
        let Err(DispatchError::Handler(error)) = dispatch(&leaf(0), raw).await else {
            panic!("expected handler error");
        };
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_body_never_reaches_handler() {
        let mut raw = request(Method::POST, "/items");
        raw.body = json!({"price": -1});
        let Err(DispatchError::ValidationFailed { slot, errors }) = dispatch(&leaf(1), raw).await
        else {
            panic!("expected validation failure");
        };
        assert_eq!(slot, Slot::Body);
        assert_eq!(errors.messages_at("name"), ["Required"]);
        assert_eq!(
            errors.messages_at("price"),
            ["Must be greater than or equal to 0"]
        );
    }

    #[tokio::test]
    async fn union_picks_first_matching_candidate() {
        let mut raw = request(Method::POST, "/pets");
        raw.body = json!({"name": "Tom", "indoor": true});
        let Ok(payload) = dispatch(&leaf(2), raw).await else {
            panic!("dispatch failed");
        };
        assert_eq!(body_of(payload), json!({"kind": "cat", "name": "Tom"}));
    }

    #[tokio::test]
    async fn union_failure_merges_every_candidate() {
        let mut raw = request(Method::POST, "/pets");
        raw.body = json!({"name": 3});
        let Err(DispatchError::UnionValidationFailed { errors, .. }) =
            dispatch(&leaf(2), raw).await
        else {
            panic!("expected union failure");
        };
        assert_eq!(errors.messages_at("name"), ["Expected string, received number"]);
        assert_eq!(errors.messages_at("breed"), ["Required"]);
        assert_eq!(errors.messages_at("indoor"), ["Required"]);
    }

    #[tokio::test]
    async fn auth_runs_before_validation() {
        let mut raw = request(Method::POST, "/private");
        raw.body = json!({"name": ""});
        let result = dispatch(&leaf(3), raw).await;
        assert!(matches!(
            result,
            Err(DispatchError::AuthenticationRequired {
                scheme: "BearerAuth"
            })
        ));
    }

    #[tokio::test]
    async fn principal_is_merged_into_overlay() {
        let mut raw = request(Method::POST, "/private");
        raw.headers
            .insert("authorization", HeaderValue::from_static("Bearer admin-token"));
        raw.body = json!({"name": "pen", "price": 2});
        let Ok(payload) = dispatch(&leaf(3), raw).await else {
            panic!("dispatch failed");
        };
        assert_eq!(
            body_of(payload),
            json!({"user": {"role": "admin"}, "name": "pen"})
        );
    }

    #[tokio::test]
    async fn malformed_body_is_a_body_validation_error() {
        let mut raw = request(Method::POST, "/items");
        raw.body_error = Some("Malformed JSON body".to_string());
        let Err(DispatchError::ValidationFailed { slot, errors }) = dispatch(&leaf(1), raw).await
        else {
            panic!("expected validation failure");
        };
        assert_eq!(slot, Slot::Body);
        assert_eq!(errors.errors, ["Malformed JSON body"]);
    }

    #[tokio::test]
    async fn empty_marker_slot_accepts_anything_and_middleware_contributes() {
        let mut raw = request(Method::GET, "/raw?anything=1");
        raw.query = json!({"anything": "1"});
        let Ok(payload) = dispatch(&leaf(4), raw).await else {
            panic!("dispatch failed");
        };
        assert_eq!(
            body_of(payload),
            json!({"query": {"anything": "1"}, "request_id": "req-1"})
        );
    }

    #[tokio::test]
    async fn middleware_failure_aborts() {
        let mut raw = request(Method::GET, "/raw");
        raw.headers.insert("x-block", HeaderValue::from_static("1"));
        let Err(DispatchError::Handler(error)) = dispatch(&leaf(4), raw).await else {
            panic!("expected middleware error");
        };
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
    }
}
