/* 📖 # Visitor: from value object to HTTP response

`Visitor::visit` is the entry point controllers use. It normalizes the value object through the
normalizer chain, encodes the result and wraps it in an `HttpResponse`.

While the document is generated, value object visitors may set the response status and
headers. The first write wins: an outer visitor that sets a header before delegating to an
inner one keeps its value, while headers the outer visitor never touched are still taken from
the inner one. `suppress_header` claims a header name without a value, so it is left out of
the response entirely.

Status and headers belong to one response. They are cleared when `visit` returns, whether it
succeeded or not, so a visitor handed out for one request cannot leak state into the next.
*/

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use hypermedia_base::{HttpResponse, HttpStatusCode, HypermediaError, HypermediaResult};

use crate::dispatcher::ValueObjectVisitorDispatcher;
use crate::encoder::Encoder;
use crate::generator::Generator;
use crate::normalizer::{NormalizationContext, NormalizerChain};
use crate::value::ValueObject;

const CONTENT_TYPE: &str = "Content-Type";

#[derive(Debug, Clone, PartialEq, Eq)]
enum HeaderValue {
    Value(String),
    Suppressed,
}

#[derive(Debug, Default)]
struct ResponseState {
    status: Option<HttpStatusCode>,
    headers: Vec<(String, HeaderValue)>,
}

impl ResponseState {
    fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    fn claim_header(&mut self, name: &str, value: HeaderValue) {
        if self.header(name).is_none() {
            self.headers.push((name.to_string(), value));
        }
    }

    fn reset(&mut self) {
        *self = ResponseState::default();
    }
}

#[derive(Debug)]
pub struct Visitor {
    state: ResponseState,
    dispatcher: Arc<ValueObjectVisitorDispatcher>,
    normalizers: Arc<NormalizerChain>,
    encoder: Arc<dyn Encoder>,
}

impl Visitor {
    pub fn new(
        dispatcher: Arc<ValueObjectVisitorDispatcher>,
        normalizers: Arc<NormalizerChain>,
        encoder: Arc<dyn Encoder>,
    ) -> Self {
        Self {
            state: ResponseState::default(),
            dispatcher,
            normalizers,
            encoder,
        }
    }

    /// Sets the response status unless one is already set.
    pub fn set_status(&mut self, status: HttpStatusCode) {
        if self.state.status.is_none() {
            self.state.status = Some(status);
        }
    }

    /// Sets a header unless the name was already set or suppressed.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.state
            .claim_header(name, HeaderValue::Value(value.into()));
    }

    /// Keeps `name` out of the response unless it was already set.
    pub fn suppress_header(&mut self, name: &str) {
        self.state.claim_header(name, HeaderValue::Suppressed);
    }

    pub fn status(&self) -> Option<HttpStatusCode> {
        self.state.status
    }

    /// Current value of a header; `None` if unset or suppressed.
    pub fn header(&self, name: &str) -> Option<&str> {
        match self.state.header(name) {
            Some(HeaderValue::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// True when no status or header has been recorded for the current response.
    pub fn is_pristine(&self) -> bool {
        self.state.status.is_none() && self.state.headers.is_empty()
    }

    /// Renders a nested value object into the document `generator` is building.
    pub fn visit_value_object(
        &mut self,
        generator: &mut Generator,
        value: &dyn ValueObject,
    ) -> HypermediaResult<()> {
        let dispatcher = Arc::clone(&self.dispatcher);
        dispatcher.visit(self, generator, value)
    }

    /// Renders `value` as a complete response and resets the response state.
    #[instrument(skip_all, fields(type_name = value.type_name()))]
    pub fn visit(&mut self, value: &dyn ValueObject) -> HypermediaResult<HttpResponse> {
        let result = self.render(value);
        if let Err(err) = &result {
            warn!(error = %err, "Rendering failed");
        }
        self.state.reset();
        result
    }

    fn render(&mut self, value: &dyn ValueObject) -> HypermediaResult<HttpResponse> {
        if let Some(error) = value.as_internal_error() {
            return Err(HypermediaError::internal_error_value(error.to_string()).into());
        }
        let mut context = NormalizationContext::new(self.encoder.format());
        let normalizers = Arc::clone(&self.normalizers);
        let Some(normalizer) = normalizers.find(value, &context) else {
            let tried = self
                .dispatcher
                .registry()
                .hierarchy()
                .ancestry(value.type_name());
            return Err(HypermediaError::no_visitor_found(tried).into());
        };
        let data = normalizer.normalize(value, self, &mut context)?;

        let mut response = HttpResponse::new(self.state.status.unwrap_or(HttpStatusCode::Ok));
        for (name, header) in &self.state.headers {
            if let HeaderValue::Value(header_value) = header {
                response
                    .headers_mut()
                    .insert(name.as_str(), header_value.as_str());
            }
        }

        if data.is_null() {
            debug!(status = %response.status(), "Rendered response without body");
            return Ok(response);
        }
        let body = self.encoder.encode(&data, &context.encoder_context)?;
        if self.state.header(CONTENT_TYPE).is_none() {
            response
                .headers_mut()
                .insert(CONTENT_TYPE, self.encoder.content_type(&context.encoder_context));
        }
        debug!(status = %response.status(), bytes = body.len(), "Rendered response");
        Ok(response.with_body(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{ValueObjectVisitorResolver, VisitorRegistry};
    use crate::encoder::JsonEncoder;
    use crate::normalizer::VisitorAdapterNormalizer;
    use crate::value::downcast;
    use crate::value_object_visitor::ValueObjectVisitor;
    use hypermedia_base::ErrorKind;

    #[derive(Debug)]
    struct Created {
        id: i64,
    }
    crate::value_object!(Created, "content::Created");

    #[derive(Debug)]
    struct Deleted;
    crate::value_object!(Deleted, "content::Deleted");

    #[derive(Debug)]
    struct Unknown;
    crate::value_object!(Unknown, "content::Unknown");

    #[derive(Debug)]
    struct CreatedVisitor;

    impl ValueObjectVisitor for CreatedVisitor {
        fn visit(
            &self,
            visitor: &mut Visitor,
            generator: &mut Generator,
            value: &dyn ValueObject,
        ) -> HypermediaResult<()> {
            let created = downcast::<Created>(value)?;
            visitor.set_status(HttpStatusCode::Created);
            visitor.set_header("Location", format!("/content/objects/{}", created.id));
            generator.start_object_element("Content", None)?;
            generator.value_element("id", created.id)?;
            generator.end_object_element("Content")
        }
    }

    #[derive(Debug)]
    struct DeletedVisitor;

    impl ValueObjectVisitor for DeletedVisitor {
        fn visit(
            &self,
            visitor: &mut Visitor,
            _generator: &mut Generator,
            _value: &dyn ValueObject,
        ) -> HypermediaResult<()> {
            visitor.set_status(HttpStatusCode::NoContent);
            Ok(())
        }
    }

    fn visitor() -> Visitor {
        let mut registry = VisitorRegistry::new();
        registry.register("content::Created", CreatedVisitor);
        registry.register("content::Deleted", DeletedVisitor);
        let registry = Arc::new(registry);
        let adapter = VisitorAdapterNormalizer::new(
            ValueObjectVisitorResolver::new(Arc::clone(&registry)),
            "vnd.acme.api",
        );
        Visitor::new(
            Arc::new(ValueObjectVisitorDispatcher::new(registry)),
            Arc::new(NormalizerChain::new(vec![Arc::new(adapter)])),
            Arc::new(JsonEncoder),
        )
    }

    #[test]
    fn test_status_and_headers_first_write_wins() {
        let mut visitor = visitor();
        visitor.set_status(HttpStatusCode::Ok);
        visitor.set_status(HttpStatusCode::NotFound);
        visitor.set_header("X", "a");
        visitor.set_header("x", "b");

        assert_eq!(visitor.status(), Some(HttpStatusCode::Ok));
        assert_eq!(visitor.header("X"), Some("a"));
    }

    #[test]
    fn test_suppressed_header_is_never_set() {
        let mut visitor = visitor();
        visitor.suppress_header("Location");
        visitor.set_header("Location", "/somewhere");
        assert_eq!(visitor.header("Location"), None);

        let response = visitor.visit(&Created { id: 4 }).unwrap();
        assert!(!response.headers().contains("Location"));
    }

    #[test]
    fn test_visit_builds_response_from_visitor_state() {
        let mut visitor = visitor();
        let response = visitor.visit(&Created { id: 4 }).unwrap();

        assert_eq!(response.status(), HttpStatusCode::Created);
        assert_eq!(
            response.headers().get("Location"),
            Some(&"/content/objects/4".to_string())
        );
        assert_eq!(
            response.headers().get("Content-Type"),
            Some(&"application/vnd.acme.api.Content+json".to_string())
        );
        assert_eq!(
            response.body().as_string(),
            Some(r#"{"Content":{"_media-type":"application/vnd.acme.api.Content+json","id":4}}"#.to_string())
        );
        assert!(visitor.is_pristine());
    }

    #[test]
    fn test_outer_headers_take_precedence() {
        let mut visitor = visitor();
        visitor.set_header("Location", "/content/objects/outer");
        visitor.set_header("content-type", "application/json");
        let response = visitor.visit(&Created { id: 4 }).unwrap();

        assert_eq!(
            response.headers().get("Location"),
            Some(&"/content/objects/outer".to_string())
        );
        assert_eq!(
            response.headers().get("Content-Type"),
            Some(&"application/json".to_string())
        );
    }

    #[test]
    fn test_empty_document_has_no_body() {
        let mut visitor = visitor();
        let response = visitor.visit(&Deleted).unwrap();

        assert_eq!(response.status(), HttpStatusCode::NoContent);
        assert!(response.body().is_empty());
        assert!(!response.headers().contains("Content-Type"));
    }

    #[test]
    fn test_state_is_reset_after_failures() {
        let mut visitor = visitor();
        visitor.set_status(HttpStatusCode::Conflict);
        visitor.set_header("X-Trace", "1");

        let err = visitor.visit(&Unknown).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NoVisitorFound { .. }));
        assert!(visitor.is_pristine());

        let response = visitor.visit(&Deleted).unwrap();
        assert_eq!(response.status(), HttpStatusCode::NoContent);
        assert!(!response.headers().contains("X-Trace"));
    }
}
