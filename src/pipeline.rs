//! Compilation Pipeline
//!
//! ```text
//! raw files → qualify → filter (only with roots) → strip options (only when disabled)
//! ```
//!
//! Every stage takes an immutable snapshot and returns a new one, so
//! independent sets of files can be compiled concurrently.

use tracing::{debug, info};

use crate::checksum::Checksum;
use crate::error::Result;
use crate::graph;
use crate::options;
use crate::qualify;
use crate::schema::ProtoFile;

/// What to compile
#[derive(Debug, Clone)]
pub struct CompileRequest {
    /// Declarations to retain; `None` keeps everything and skips filtering
    pub roots: Option<Vec<String>>,
    /// Keep option values and option-extending extend blocks
    pub emit_options: bool,
}

impl Default for CompileRequest {
    fn default() -> Self {
        Self {
            roots: None,
            emit_options: true,
        }
    }
}

impl CompileRequest {
    pub fn with_roots<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roots: Some(roots.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Roots to filter to, or `None` when filtering is skipped.
    ///
    /// An empty list means the same as no list: keep everything.
    pub fn filter_roots(&self) -> Option<&[String]> {
        self.roots.as_deref().filter(|roots| !roots.is_empty())
    }

    /// Parse a comma-separated roots list; blank entries are ignored
    pub fn parse_roots(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Result of a compilation, ready for the backend
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub files: Vec<ProtoFile>,
    pub checksum: Checksum,
}

impl CompileOutput {
    /// Fully-qualified names of every declaration in the output, in order
    pub fn declaration_names(&self) -> Vec<String> {
        let forest = graph::Forest::build(&self.files);
        forest.names().map(String::from).collect()
    }
}

/// Run the full pipeline over parsed files
pub fn compile(files: &[ProtoFile], request: &CompileRequest) -> Result<CompileOutput> {
    let all_names = qualify::collect_type_names(files);
    debug!(files = files.len(), types = all_names.len(), "collected type names");

    let qualified = qualify::qualify_files(files, &all_names)?;
    info!(files = qualified.len(), "qualified all type references");

    let mut output = match request.filter_roots() {
        Some(roots) => graph::filter(&qualified, roots)?,
        None => {
            debug!("no roots given, keeping every declaration");
            qualified
        }
    };

    if !request.emit_options {
        output = options::strip_options(&output);
        debug!("stripped option metadata");
    }

    let checksum = Checksum::of_model(&output)?;
    info!(files = output.len(), checksum = %checksum, "compilation finished");
    Ok(CompileOutput {
        files: output,
        checksum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::schema::{Field, Label, Message, Rpc, Service};

    fn raw_model() -> Vec<ProtoFile> {
        vec![ProtoFile::new("pkg.proto", "pkg")
            .with_type(Message::new("A").with_field(Field::new(Label::Optional, "B", "b", 1)))
            .with_type(Message::new("B"))
            .with_type(Message::new("C"))
            .with_service(Service::new("S").with_rpc(Rpc::new("M", "A", "B")))
            .with_qualified_names()]
    }

    #[test]
    fn test_parse_roots() {
        assert_eq!(
            CompileRequest::parse_roots("pkg.A, pkg.B,,"),
            vec!["pkg.A".to_string(), "pkg.B".to_string()]
        );
        assert!(CompileRequest::parse_roots("").is_empty());
    }

    #[test]
    fn test_no_roots_keeps_everything() {
        let output = compile(&raw_model(), &CompileRequest::default()).unwrap();
        assert_eq!(output.declaration_names(), vec!["pkg.A", "pkg.B", "pkg.C", "pkg.S"]);
    }

    #[test]
    fn test_roots_filter_after_qualification() {
        let output = compile(&raw_model(), &CompileRequest::with_roots(["pkg.S"])).unwrap();
        assert_eq!(output.declaration_names(), vec!["pkg.A", "pkg.B", "pkg.S"]);
        assert_eq!(output.files[0].services[0].rpcs[0].request_type, "pkg.A");
    }

    #[test]
    fn test_empty_roots_list_skips_filtering() {
        for list in ["", ",", " , "] {
            let request = CompileRequest {
                roots: Some(CompileRequest::parse_roots(list)),
                emit_options: true,
            };
            assert!(request.filter_roots().is_none());
            let output = compile(&raw_model(), &request).unwrap();
            assert_eq!(output.declaration_names(), vec!["pkg.A", "pkg.B", "pkg.C", "pkg.S"]);
        }

        let request = CompileRequest::with_roots(Vec::<String>::new());
        let unfiltered = compile(&raw_model(), &CompileRequest::default()).unwrap();
        assert_eq!(compile(&raw_model(), &request).unwrap().checksum, unfiltered.checksum);
    }

    #[test]
    fn test_unknown_root_fails() {
        let err = compile(&raw_model(), &CompileRequest::with_roots(["pkg.Z"])).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRoot { .. }));
    }

    #[test]
    fn test_output_is_deterministic() {
        let request = CompileRequest::with_roots(["pkg.A"]);
        let first = compile(&raw_model(), &request).unwrap();
        let second = compile(&raw_model(), &request).unwrap();
        assert_eq!(first.checksum, second.checksum);
        assert_eq!(
            serde_json::to_string(&first.files).unwrap(),
            serde_json::to_string(&second.files).unwrap()
        );
    }
}
