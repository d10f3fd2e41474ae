use askama::Template;

/// The generated Slang file: banner, imports and the emitted declarations.
#[derive(Template, Clone, Debug)]
#[template(path = "bindings.slang", escape = "none")]
pub(crate) struct BindingsTemplate<'a> {
    headers: &'a [String],
    imports: &'a [String],
    usings: &'a [String],
    namespace: Option<&'a str>,
    body: &'a str,
}

impl<'a> BindingsTemplate<'a> {
    /// Frame `body` for the given headers.
    pub(crate) fn new(
        headers: &'a [String],
        imports: &'a [String],
        usings: &'a [String],
        namespace: Option<&'a str>,
        body: &'a str,
    ) -> Self {
        Self {
            headers,
            imports,
            usings,
            namespace,
            body,
        }
    }
}
