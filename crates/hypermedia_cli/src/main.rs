/* 📖 # A CLI for trying out the output pipeline

`hypermedia <ResourceName> <file.json> [config.toml]`

The JSON file is treated as a generic resource: it becomes an object element named
`<ResourceName>` whose members are written as field-type hashes. The response is printed the way
an HTTP client would see it: status line, headers, blank line, body.

There is no argument parser; three positional arguments do not need one.

Exit codes:
- 0: the resource was rendered
- 1: bad arguments, unreadable input or a rendering error
*/

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use serde_json::{Map, Value};
use tracing::info;

use hypermedia_base::tracing::init_tracing;
use hypermedia_base::{ErrorKind, HttpResponse, HypermediaError, HypermediaResult, ResultExt};
use hypermedia_output::{
    Generator, OutputConfig, OutputPipeline, ValueObject, ValueObjectVisitor, Visitor,
    VisitorRegistry, downcast, load_config, value_object,
};

const RESOURCE_TYPE: &str = "cli::Resource";

/// A JSON object read from disk, rendered under a caller-chosen name.
#[derive(Debug)]
struct Resource {
    name: String,
    fields: Map<String, Value>,
}
value_object!(Resource, RESOURCE_TYPE);

#[derive(Debug)]
struct ResourceVisitor;

impl ValueObjectVisitor for ResourceVisitor {
    fn visit(
        &self,
        _visitor: &mut Visitor,
        generator: &mut Generator,
        value: &dyn ValueObject,
    ) -> HypermediaResult<()> {
        let resource = downcast::<Resource>(value)?;
        generator.start_object_element(&resource.name, None)?;
        for (name, field) in &resource.fields {
            generator.generate_field_type_hash(name, field)?;
        }
        generator.end_object_element(&resource.name)
    }
}

fn read_resource(name: &str, path: &Path) -> HypermediaResult<Resource> {
    let text = fs::read_to_string(path).map_err(|source| {
        Box::new(HypermediaError::new(ErrorKind::FileError {
            path: path.to_path_buf(),
            source,
        }))
    })?;
    let fields = match serde_json::from_str(&text) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => {
            return Err(HypermediaError::message("Resource file must contain a JSON object")
                .context(format!("Reading {}", path.display()))
                .into());
        }
        Err(err) => {
            return Err(HypermediaError::message(err.to_string())
                .context(format!("Reading {}", path.display()))
                .into());
        }
    };
    Ok(Resource {
        name: name.to_string(),
        fields,
    })
}

fn render(name: &str, resource_path: &Path, config_path: Option<&Path>) -> HypermediaResult<HttpResponse> {
    let config = match config_path {
        Some(path) => load_config(path)?,
        None => OutputConfig::default(),
    };
    info!(vendor = %config.vendor, format = %config.format, "Configuration loaded");

    let mut registry = VisitorRegistry::new();
    registry.register(RESOURCE_TYPE, ResourceVisitor);
    let pipeline = OutputPipeline::new(config, registry);

    let resource = read_resource(name, resource_path)?;
    pipeline
        .render(&resource)
        .with_context(|| format!("Rendering {}", resource_path.display()))
}

fn print_response(response: &HttpResponse) {
    println!("HTTP/1.1 {}", response.status());
    for (name, value) in response.headers().iter() {
        println!("{}: {}", name, value);
    }
    println!();
    if let Some(body) = response.body().as_string() {
        println!("{}", body);
    }
}

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: Failed to initialise tracing: {}", e);
        process::exit(1);
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let (name, resource_path, config_path) = match args.as_slice() {
        [name, resource] => (name, PathBuf::from(resource), None),
        [name, resource, config] => (name, PathBuf::from(resource), Some(PathBuf::from(config))),
        _ => {
            eprintln!("Usage: hypermedia <ResourceName> <file.json> [config.toml]");
            process::exit(1);
        }
    };

    match render(name, &resource_path, config_path.as_deref()) {
        Ok(response) => print_response(&response),
        Err(e) => {
            eprintln!("Error: {:?}", e);
            process::exit(1);
        }
    }
}
