use crate::error::{ReportError, Result};
use std::path::{Path, PathBuf};

/// Text with `$name` / `${name}` placeholders; `$$` is a literal dollar.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    text: String,
}

impl Template {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace every placeholder with its value from `vars`.
    ///
    /// Values are inserted verbatim and never rescanned. A placeholder with
    /// no value, or a `$` not starting one, is an error.
    pub fn substitute<V: AsRef<str>>(&self, vars: &[(&str, V)]) -> Result<String> {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(tail) = after.strip_prefix('$') {
                out.push('$');
                rest = tail;
                continue;
            }

            let (ident, tail) = if let Some(braced) = after.strip_prefix('{') {
                let end = braced.find('}').ok_or_else(|| self.invalid(after))?;
                (&braced[..end], &braced[end + 1..])
            } else {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], &after[end..])
            };
            if !is_identifier(ident) {
                return Err(self.invalid(after));
            }

            let value = vars
                .iter()
                .find(|(key, _)| *key == ident)
                .map(|(_, value)| value.as_ref())
                .ok_or_else(|| ReportError::Template {
                    template: self.name.clone(),
                    placeholder: ident.to_string(),
                })?;
            out.push_str(value);
            rest = tail;
        }

        out.push_str(rest);
        Ok(out)
    }

    fn invalid(&self, at: &str) -> ReportError {
        let snippet: String = at.chars().take(16).collect();
        ReportError::Parse(format!("Invalid placeholder in {} at '${snippet}'", self.name))
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone)]
pub enum TemplateSource {
    Builtin { name: &'static str, text: &'static str },
    File(PathBuf),
}

impl TemplateSource {
    fn file_name(&self) -> String {
        match self {
            TemplateSource::Builtin { name, .. } => name.to_string(),
            TemplateSource::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    fn read(&self) -> Result<String> {
        match self {
            TemplateSource::Builtin { text, .. } => Ok(text.to_string()),
            TemplateSource::File(path) => Ok(std::fs::read_to_string(path)?),
        }
    }

    fn load(&self) -> Result<Template> {
        Ok(Template::new(self.file_name(), self.read()?))
    }
}

macro_rules! builtin {
    ($file:literal) => {
        TemplateSource::Builtin {
            name: $file,
            text: include_str!(concat!("../../assets/", $file)),
        }
    };
}

/// Where every template and inline asset of the report comes from.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub header: TemplateSource,
    pub footer: TemplateSource,
    pub changeset_top: TemplateSource,
    pub changeset_bottom: TemplateSource,
    pub committer_tab: TemplateSource,
    pub diffstat: TemplateSource,
    pub diffstat_desc: TemplateSource,
    pub tabs_js: TemplateSource,
    pub tabs_css: TemplateSource,
    pub style_css: TemplateSource,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateSet {
    pub fn builtin() -> Self {
        Self {
            header: builtin!("single_header.html"),
            footer: builtin!("single_footer.html"),
            changeset_top: builtin!("single_changeset_top.html"),
            changeset_bottom: builtin!("single_changeset_bottom.html"),
            committer_tab: builtin!("committer_tab.html"),
            diffstat: builtin!("diffstat.html"),
            diffstat_desc: builtin!("diffstat_desc.html"),
            tabs_js: builtin!("simpletabs.js"),
            tabs_css: builtin!("simpletabs.css"),
            style_css: builtin!("style.css"),
        }
    }

    /// Replace every source that has a file of the same name in `dir`.
    pub fn with_overrides(mut self, dir: &Path) -> Self {
        for source in self.sources_mut() {
            let candidate = dir.join(source.file_name());
            if candidate.is_file() {
                log::info!("Using template {}", candidate.display());
                *source = TemplateSource::File(candidate);
            }
        }
        self
    }

    pub fn load(&self) -> Result<Templates> {
        Ok(Templates {
            header: self.header.load()?,
            footer: self.footer.load()?,
            changeset_top: self.changeset_top.load()?,
            changeset_bottom: self.changeset_bottom.load()?,
            committer_tab: self.committer_tab.load()?,
            diffstat: self.diffstat.load()?,
            diffstat_desc: self.diffstat_desc.load()?,
            tabs_js: self.tabs_js.read()?,
            tabs_css: self.tabs_css.read()?,
            style_css: self.style_css.read()?,
        })
    }

    fn sources_mut(&mut self) -> [&mut TemplateSource; 10] {
        [
            &mut self.header,
            &mut self.footer,
            &mut self.changeset_top,
            &mut self.changeset_bottom,
            &mut self.committer_tab,
            &mut self.diffstat,
            &mut self.diffstat_desc,
            &mut self.tabs_js,
            &mut self.tabs_css,
            &mut self.style_css,
        ]
    }
}

/// Loaded templates plus the raw CSS/JS embedded in the header.
#[derive(Debug, Clone)]
pub struct Templates {
    pub header: Template,
    pub footer: Template,
    pub changeset_top: Template,
    pub changeset_bottom: Template,
    pub committer_tab: Template,
    pub diffstat: Template,
    pub diffstat_desc: Template,
    pub tabs_js: String,
    pub tabs_css: String,
    pub style_css: String,
}
