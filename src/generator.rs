use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use askama::Template;
use log::info;

use crate::{
    Frontend, ParseOptions, Result,
    emitter::EnumRules,
    session::{Session, normalize},
    template::BindingsTemplate,
};

/// Enum names matched by this are unscoped unless told otherwise.
const DEFAULT_UNSCOPED_ENUMS: &str = ".*";
/// Prepended to enum cases that would start with a digit.
const DEFAULT_FALLBACK_PREFIX: &str = "e";

/// A builder used to generate Slang bindings for C headers.
#[non_exhaustive]
#[derive(Default, Debug, Clone)]
pub struct BindingGenerator {
    headers: Vec<String>,
    imported: Vec<PathBuf>,
    imports: Vec<String>,
    usings: Vec<String>,
    namespace: Option<String>,
    parse_options: ParseOptions,
    unscoped_enums: Option<Vec<String>>,
    enum_prefixes: Vec<String>,
    enum_cases: Vec<String>,
    fallback_prefix: Option<String>,
    byte_bool: bool,
}

impl BindingGenerator {
    /// Creates a new blank binding generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header whose declarations are emitted.
    ///
    /// The path is listed verbatim in the banner of the output.
    pub fn header(&mut self, header: &str) -> &mut Self {
        self.headers.push(header.to_string());
        self
    }

    /// Add a header whose declarations are known to the bindings already.
    ///
    /// Its types are neither emitted nor synthesized, so they have to come
    /// from an imported module.
    pub fn imported<P: AsRef<Path>>(&mut self, header: P) -> &mut Self {
        self.imported.push(header.as_ref().to_owned());
        self
    }

    /// Emit `import <module>;` at the top of the output.
    pub fn import(&mut self, module: &str) -> &mut Self {
        self.imports.push(module.to_string());
        self
    }

    /// Emit `using <namespace>;` at the top of the output.
    pub fn using(&mut self, namespace: &str) -> &mut Self {
        self.usings.push(namespace.to_string());
        self
    }

    /// Wrap every declaration in `namespace <namespace> { ... }`.
    pub fn namespace(&mut self, namespace: &str) -> &mut Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Define a preprocessor macro, as `NAME` or `NAME=VALUE`.
    pub fn define(&mut self, define: &str) -> &mut Self {
        self.parse_options.defines.push(define.to_string());
        self
    }

    /// Add a path to the header lookup path of the front-end.
    pub fn include<P: AsRef<Path>>(&mut self, p: P) -> &mut Self {
        self.parse_options.include_dirs.push(p.as_ref().to_owned());
        self
    }

    /// Configures the target to parse headers for.
    pub fn target(&mut self, target: &str) -> &mut Self {
        self.parse_options.target = Some(target.to_string());
        self
    }

    /// Mark enums whose name fully matches `pattern` as `[UnscopedEnum]`.
    ///
    /// Every enum is unscoped until the first pattern is added.
    pub fn unscoped_enum(&mut self, pattern: &str) -> &mut Self {
        self.unscoped_enums
            .get_or_insert_with(Vec::new)
            .push(pattern.to_string());
        self
    }

    /// Remove the longest match of `pattern` inside the common prefix of
    /// every enum's cases.
    pub fn remove_enum_prefix(&mut self, pattern: &str) -> &mut Self {
        self.enum_prefixes.push(pattern.to_string());
        self
    }

    /// Drop enum cases whose name fully matches `pattern`.
    pub fn remove_enum_case(&mut self, pattern: &str) -> &mut Self {
        self.enum_cases.push(pattern.to_string());
        self
    }

    /// Prefix for enum cases that start with a digit once their prefix is
    /// removed. An empty prefix keeps such cases unchanged.
    pub fn fallback_prefix(&mut self, prefix: &str) -> &mut Self {
        self.fallback_prefix = Some(prefix.to_string());
        self
    }

    /// Translate `bool` to `uint8_t`.
    pub fn byte_bool(&mut self, byte_bool: bool) -> &mut Self {
        self.byte_bool = byte_bool;
        self
    }

    /// Generate the bindings and return them as a string.
    pub fn generate(&self, frontend: &mut dyn Frontend) -> Result<String> {
        let default_unscoped = [DEFAULT_UNSCOPED_ENUMS.to_string()];
        let rules = EnumRules::new(
            self.unscoped_enums.as_deref().unwrap_or(&default_unscoped),
            &self.enum_prefixes,
            &self.enum_cases,
            self.fallback_prefix
                .as_deref()
                .unwrap_or(DEFAULT_FALLBACK_PREFIX),
        )?;

        let indent = usize::from(self.namespace.is_some());
        let mut session = Session::new(rules, self.byte_bool).with_base_indent(indent);
        let requested = self
            .headers
            .iter()
            .map(|header| normalize(Path::new(header)))
            .collect::<Vec<_>>();
        for path in &requested {
            session.allow_file(path.clone());
        }

        // Imported headers only teach the session which names exist.
        session.set_silent(true);
        for header in &self.imported {
            info!("reading imported header {}", header.display());
            let unit = frontend.parse(header, &self.parse_options)?;
            session.emit_unit(&unit, &normalize(header));
        }
        session.set_silent(false);

        for (header, path) in self.headers.iter().zip(&requested) {
            info!("generating bindings for {header}");
            let unit = frontend.parse(Path::new(header), &self.parse_options)?;
            session.emit_unit(&unit, path);
        }
        session.finish();

        let body = session.into_body();
        let mut output = BindingsTemplate::new(
            &self.headers,
            &self.imports,
            &self.usings,
            self.namespace.as_deref(),
            &body,
        )
        .render()?;
        if !output.ends_with('\n') {
            output.push('\n');
        }
        Ok(output)
    }

    /// Generate the bindings into `writer`.
    pub fn write_to<W: Write>(&self, frontend: &mut dyn Frontend, mut writer: W) -> Result<()> {
        let output = self.generate(frontend)?;
        writer.write_all(output.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Generate the bindings into the file at `path`.
    ///
    /// Nothing is written when generation fails.
    pub fn generate_to_file<P: AsRef<Path>>(
        &self,
        frontend: &mut dyn Frontend,
        path: P,
    ) -> Result<()> {
        let output = self.generate(frontend)?;
        File::create(path.as_ref())?.write_all(output.as_bytes())?;
        Ok(())
    }
}
