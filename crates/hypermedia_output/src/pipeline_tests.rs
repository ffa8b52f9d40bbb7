/* 📖 # End-to-end pipeline tests

These tests go through `OutputPipeline` the way a controller would: register visitors, render
a value object, and inspect the resulting HTTP response. The value objects below are small
stand-ins for the domain types of a content repository.
*/

#[cfg(test)]
mod tests {
    use std::io::Write;

    use expect_test::expect;
    use hypermedia_base::{ErrorKind, HttpResponse, HttpStatusCode, HypermediaError, HypermediaResult};
    use serde::Serialize;

    use crate::{
        Generator, Limitation, MEDIA_TYPE_ATTRIBUTE, OutputConfig, OutputFormat, OutputPipeline,
        TranslatedValues, ValueObject, ValueObjectVisitor, Visitor, VisitorRegistry, downcast,
    };

    #[derive(Debug)]
    struct Greeting {
        title: String,
    }
    crate::value_object!(Greeting, "greetings::Greeting");

    #[derive(Debug)]
    struct Role {
        id: i64,
        identifier: String,
        names: TranslatedValues,
        policies: Vec<Policy>,
    }
    crate::value_object!(Role, "user::Role");

    #[derive(Debug)]
    struct Policy {
        module: String,
        function: String,
        limitations: Vec<Limitation>,
    }
    crate::value_object!(Policy, "user::Policy");

    #[derive(Debug)]
    struct RoleList {
        roles: Vec<Role>,
    }
    crate::value_object!(RoleList, "user::RoleList");

    #[derive(Debug, Serialize)]
    struct Metadata {
        name: String,
        language: String,
    }
    crate::value_object!(Metadata, "content::Metadata", serde);

    #[derive(Debug)]
    struct Content {
        id: i64,
        metadata: Metadata,
    }
    crate::value_object!(Content, "content::Content");

    #[derive(Debug)]
    struct ContentCreated {
        content: Content,
    }
    crate::value_object!(ContentCreated, "content::ContentCreated");

    #[derive(Debug)]
    struct DraftInfo;
    crate::value_object!(DraftInfo, "content::DraftInfo");

    #[derive(Debug)]
    struct Orphan;
    crate::value_object!(Orphan, "content::Orphan");

    #[derive(Debug, Serialize)]
    struct Version {
        major: u32,
        minor: u32,
    }
    crate::value_object!(Version, "system::Version", serde);

    #[derive(Debug)]
    struct Broken;
    crate::value_object!(Broken, "tests::Broken");

    #[derive(Debug)]
    struct GreetingVisitor;

    impl ValueObjectVisitor for GreetingVisitor {
        fn visit(
            &self,
            _visitor: &mut Visitor,
            generator: &mut Generator,
            value: &dyn ValueObject,
        ) -> HypermediaResult<()> {
            let greeting = downcast::<Greeting>(value)?;
            generator.start_object_element("Greeting", None)?;
            generator.start_attribute(MEDIA_TYPE_ATTRIBUTE, generator.media_type("Greeting"))?;
            generator.end_attribute(MEDIA_TYPE_ATTRIBUTE)?;
            generator.value_element("title", greeting.title.as_str())?;
            generator.end_object_element("Greeting")
        }
    }

    #[derive(Debug)]
    struct RoleVisitor;

    impl ValueObjectVisitor for RoleVisitor {
        fn visit(
            &self,
            visitor: &mut Visitor,
            generator: &mut Generator,
            value: &dyn ValueObject,
        ) -> HypermediaResult<()> {
            let role = downcast::<Role>(value)?;
            generator.start_object_element("Role", None)?;
            generator.attribute("href", format!("/user/roles/{}", role.id))?;
            generator.value_element("identifier", role.identifier.as_str())?;
            self.visit_names_list(generator, &role.names)?;
            generator.start_object_element("Policies", Some("PolicyList"))?;
            generator.start_list("Policy")?;
            for policy in &role.policies {
                visitor.visit_value_object(generator, policy)?;
            }
            generator.end_list("Policy")?;
            generator.end_object_element("Policies")?;
            generator.end_object_element("Role")
        }
    }

    #[derive(Debug)]
    struct PolicyVisitor;

    impl ValueObjectVisitor for PolicyVisitor {
        fn visit(
            &self,
            _visitor: &mut Visitor,
            generator: &mut Generator,
            value: &dyn ValueObject,
        ) -> HypermediaResult<()> {
            let policy = downcast::<Policy>(value)?;
            generator.start_object_element("Policy", None)?;
            generator.value_element("module", policy.module.as_str())?;
            generator.value_element("function", policy.function.as_str())?;
            generator.start_list("limitations")?;
            for limitation in &policy.limitations {
                self.visit_limitation(generator, limitation)?;
            }
            generator.end_list("limitations")?;
            generator.end_object_element("Policy")
        }
    }

    #[derive(Debug)]
    struct RoleListVisitor;

    impl ValueObjectVisitor for RoleListVisitor {
        fn visit(
            &self,
            visitor: &mut Visitor,
            generator: &mut Generator,
            value: &dyn ValueObject,
        ) -> HypermediaResult<()> {
            let list = downcast::<RoleList>(value)?;
            generator.start_object_element("RoleList", None)?;
            generator.attribute("href", "/user/roles")?;
            generator.start_list("Role")?;
            for role in &list.roles {
                visitor.visit_value_object(generator, role)?;
            }
            generator.end_list("Role")?;
            generator.end_object_element("RoleList")
        }
    }

    #[derive(Debug)]
    struct ContentVisitor;

    impl ValueObjectVisitor for ContentVisitor {
        fn visit(
            &self,
            visitor: &mut Visitor,
            generator: &mut Generator,
            value: &dyn ValueObject,
        ) -> HypermediaResult<()> {
            let content = downcast::<Content>(value)?;
            visitor.set_status(HttpStatusCode::Ok);
            visitor.set_header("Location", format!("/content/objects/{}/versions/1", content.id));
            visitor.set_header("ETag", "\"1\"");
            visitor.set_header("Cache-Control", "no-cache");
            generator.start_object_element("Content", None)?;
            generator.start_hash_element("CurrentVersion")?;
            visitor.visit_value_object(generator, &content.metadata)?;
            generator.end_hash_element("CurrentVersion")?;
            generator.end_object_element("Content")
        }
    }

    #[derive(Debug)]
    struct ContentCreatedVisitor;

    impl ValueObjectVisitor for ContentCreatedVisitor {
        fn visit(
            &self,
            visitor: &mut Visitor,
            generator: &mut Generator,
            value: &dyn ValueObject,
        ) -> HypermediaResult<()> {
            let created = downcast::<ContentCreated>(value)?;
            visitor.set_status(HttpStatusCode::Created);
            visitor.set_header("Location", format!("/content/objects/{}", created.content.id));
            visitor.suppress_header("Cache-Control");
            visitor.visit_value_object(generator, &created.content)
        }
    }

    #[derive(Debug)]
    struct InfoVisitor;

    impl ValueObjectVisitor for InfoVisitor {
        fn visit(
            &self,
            _visitor: &mut Visitor,
            generator: &mut Generator,
            value: &dyn ValueObject,
        ) -> HypermediaResult<()> {
            generator.start_object_element("Info", None)?;
            generator.value_element("type", value.type_name())?;
            generator.end_object_element("Info")
        }
    }

    #[derive(Debug)]
    struct BrokenVisitor;

    impl ValueObjectVisitor for BrokenVisitor {
        fn visit(
            &self,
            visitor: &mut Visitor,
            generator: &mut Generator,
            _value: &dyn ValueObject,
        ) -> HypermediaResult<()> {
            visitor.set_status(HttpStatusCode::Accepted);
            generator.start_object_element("Broken", None)?;
            generator.start_hash_element("a")?;
            generator.end_hash_element("a")?;
            generator.start_hash_element("a")?;
            generator.end_hash_element("a")?;
            generator.end_object_element("Broken")
        }
    }

    fn registry() -> VisitorRegistry {
        let mut registry = VisitorRegistry::new();
        registry
            .register("greetings::Greeting", GreetingVisitor)
            .register("user::Role", RoleVisitor)
            .register("user::Policy", PolicyVisitor)
            .register("user::RoleList", RoleListVisitor)
            .register("content::Content", ContentVisitor)
            .register("content::ContentCreated", ContentCreatedVisitor)
            .register("content::Info", InfoVisitor)
            .register("tests::Broken", BrokenVisitor);
        registry
            .declare_parent("content::DraftInfo", "content::Info")
            .unwrap();
        registry
            .declare_parent("content::Orphan", "content::Unregistered")
            .unwrap();
        registry
    }

    fn pipeline(format: OutputFormat) -> OutputPipeline {
        let config = OutputConfig {
            vendor: "vnd.acme.api".to_string(),
            format,
        };
        OutputPipeline::new(config, registry())
    }

    fn body(response: &HttpResponse) -> String {
        response.body().as_string().unwrap()
    }

    fn content_type(response: &HttpResponse) -> Option<&str> {
        response.headers().get("Content-Type").map(String::as_str)
    }

    fn editor() -> Role {
        Role {
            id: 1,
            identifier: "Editor".to_string(),
            names: TranslatedValues::from([("eng-GB".to_string(), "Editor".to_string())]),
            policies: vec![Policy {
                module: "content".to_string(),
                function: "read".to_string(),
                limitations: vec![Limitation {
                    identifier: "Section".to_string(),
                    values: vec!["/content/sections/1".to_string()],
                }],
            }],
        }
    }

    fn content() -> Content {
        Content {
            id: 12,
            metadata: Metadata {
                name: "Hello".to_string(),
                language: "eng-GB".to_string(),
            },
        }
    }

    #[test]
    fn test_greeting_renders_as_json() {
        let response = pipeline(OutputFormat::Json)
            .render(&Greeting {
                title: "Hello".to_string(),
            })
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::Ok);
        assert_eq!(
            content_type(&response),
            Some("application/vnd.acme.api.Greeting+json")
        );
        expect![[r#"{"Greeting":{"_media-type":"application/vnd.acme.api.Greeting+json","title":"Hello"}}"#]]
            .assert_eq(&body(&response));
    }

    #[test]
    fn test_role_renders_as_json() {
        let response = pipeline(OutputFormat::Json).render(&editor()).unwrap();
        expect![[r##"{"Role":{"_media-type":"application/vnd.acme.api.Role+json","_href":"/user/roles/1","identifier":"Editor","names":{"value":[{"_languageCode":"eng-GB","#text":"Editor"}]},"Policies":{"_media-type":"application/vnd.acme.api.PolicyList+json","Policy":[{"_media-type":"application/vnd.acme.api.Policy+json","module":"content","function":"read","limitations":[{"_identifier":"Section","values":{"ref":[{"_media-type":"application/vnd.acme.api.ref+json","_href":"/content/sections/1"}]}}]}]}}}"##]]
            .assert_eq(&body(&response));
    }

    #[test]
    fn test_role_renders_as_xml() {
        let response = pipeline(OutputFormat::Xml).render(&editor()).unwrap();
        assert_eq!(
            content_type(&response),
            Some("application/vnd.acme.api.Role+xml")
        );
        expect![[r#"<?xml version="1.0" encoding="UTF-8"?><Role media-type="application/vnd.acme.api.Role+xml" href="/user/roles/1"><identifier>Editor</identifier><names><value languageCode="eng-GB">Editor</value></names><Policies media-type="application/vnd.acme.api.PolicyList+xml"><Policy media-type="application/vnd.acme.api.Policy+xml"><module>content</module><function>read</function><limitations><limitation identifier="Section"><values><ref media-type="application/vnd.acme.api.ref+xml" href="/content/sections/1"/></values></limitation></limitations></Policy></Policies></Role>"#]]
            .assert_eq(&body(&response));
    }

    #[test]
    fn test_repeated_roles_inside_list() {
        let mut second = editor();
        second.id = 2;
        second.identifier = "Anonymous".to_string();
        second.names = TranslatedValues::new();
        second.policies = vec![];
        let list = RoleList {
            roles: vec![editor(), second],
        };

        let response = pipeline(OutputFormat::Xml).render(&list).unwrap();
        let body = body(&response);
        assert!(body.starts_with(
            r#"<?xml version="1.0" encoding="UTF-8"?><RoleList media-type="application/vnd.acme.api.RoleList+xml" href="/user/roles"><Role "#
        ));
        assert_eq!(body.matches("<Role ").count(), 2);
        assert!(body.contains(r#"<Role media-type="application/vnd.acme.api.Role+xml" href="/user/roles/2"><identifier>Anonymous</identifier><names/><Policies media-type="application/vnd.acme.api.PolicyList+xml"/></Role>"#));
    }

    #[test]
    fn test_derived_type_uses_ancestor_visitor() {
        let response = pipeline(OutputFormat::Json).render(&DraftInfo).unwrap();
        expect![[r#"{"Info":{"_media-type":"application/vnd.acme.api.Info+json","type":"content::DraftInfo"}}"#]]
            .assert_eq(&body(&response));
    }

    #[test]
    fn test_missing_visitor_lists_ancestry() {
        let err = pipeline(OutputFormat::Json).render(&Orphan).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No visitor found for content::Orphan! Tried: content::Orphan, content::Unregistered"
        );
    }

    #[test]
    fn test_value_without_visitor_uses_generic_normalizer() {
        let response = pipeline(OutputFormat::Json)
            .render(&Version { major: 1, minor: 4 })
            .unwrap();
        assert_eq!(content_type(&response), Some("application/json"));
        expect![[r#"{"major":1,"minor":4}"#]].assert_eq(&body(&response));
    }

    #[test]
    fn test_nested_value_without_visitor_becomes_field_hashes() {
        let response = pipeline(OutputFormat::Json).render(&content()).unwrap();
        expect![[r#"{"Content":{"_media-type":"application/vnd.acme.api.Content+json","CurrentVersion":{"name":"Hello","language":"eng-GB"}}}"#]]
            .assert_eq(&body(&response));
    }

    #[test]
    fn test_outer_visitor_headers_win_over_inner_ones() {
        let response = pipeline(OutputFormat::Json)
            .render(&ContentCreated { content: content() })
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::Created);
        assert_eq!(
            response.headers().get("Location"),
            Some(&"/content/objects/12".to_string())
        );
        assert_eq!(response.headers().get("ETag"), Some(&"\"1\"".to_string()));
        assert!(!response.headers().contains("Cache-Control"));
        assert_eq!(
            content_type(&response),
            Some("application/vnd.acme.api.Content+json")
        );
    }

    #[test]
    fn test_visitor_reuse_starts_from_clean_state() {
        let pipeline = pipeline(OutputFormat::Json);
        let mut visitor = pipeline.visitor();

        let created = visitor
            .visit(&ContentCreated { content: content() })
            .unwrap();
        assert_eq!(created.status(), HttpStatusCode::Created);
        assert!(visitor.is_pristine());

        let greeting = visitor
            .visit(&Greeting {
                title: "Hello".to_string(),
            })
            .unwrap();
        assert_eq!(greeting.status(), HttpStatusCode::Ok);
        assert!(!greeting.headers().contains("Location"));
        assert!(!greeting.headers().contains("ETag"));
    }

    #[test]
    fn test_structure_errors_reach_the_caller() {
        let pipeline = pipeline(OutputFormat::Json);
        let mut visitor = pipeline.visitor();
        let err = visitor.visit(&Broken).unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::DuplicateElement { .. }));
        assert_eq!(
            err.to_string(),
            "rendering tests::Broken: Element a may only occur once inside of objectElement."
        );
        assert!(visitor.is_pristine());
    }

    #[test]
    fn test_internal_errors_are_refused() {
        let err = pipeline(OutputFormat::Json)
            .render(&HypermediaError::message("database unreachable"))
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InternalErrorValue { .. }));
    }

    #[test]
    fn test_pipeline_from_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "vendor = \"vnd.acme.api\"\nformat = \"xml\"").unwrap();
        let pipeline = OutputPipeline::from_config_file(file.path(), registry()).unwrap();
        assert_eq!(pipeline.config().format, OutputFormat::Xml);

        let response = pipeline
            .render(&Greeting {
                title: "Hello".to_string(),
            })
            .unwrap();
        assert_eq!(
            content_type(&response),
            Some("application/vnd.acme.api.Greeting+xml")
        );
        expect![[r#"<?xml version="1.0" encoding="UTF-8"?><Greeting media-type="application/vnd.acme.api.Greeting+xml"><title>Hello</title></Greeting>"#]]
            .assert_eq(&body(&response));
    }
}
