//! Block parser for `define <type> { ... }` object definitions

use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::object::ObjectDefinition;
use crate::registry::TypeRegistry;

/// Source of cleaned directive lines for the block parser.
///
/// Implemented by plain streams and by the rewriting file session, which
/// additionally buffers raw lines and reacts to the block-start flush
/// boundary.
pub trait DirectiveSource {
    /// Next non-blank, comment-stripped line and its 1-based number
    ///
    /// # Errors
    /// Propagates read failures.
    fn next_data_line(&mut self) -> ConfigResult<Option<(usize, String)>>;

    /// Invoked when a block opener has been recognized, before any of the
    /// block body is consumed
    ///
    /// # Errors
    /// Propagates write failures from buffer flushing.
    fn mark_block_start(&mut self) -> ConfigResult<()> {
        Ok(())
    }

    /// Path of the underlying source, for diagnostics
    fn source_path(&self) -> Option<&Path> {
        None
    }
}

/// Parse the next object definition from `source`, skipping any lines that
/// do not belong to one. Returns `None` at end of input.
///
/// # Errors
/// `Syntax` for a directive line without a key/value separator or a
/// malformed opener; `UnterminatedBlock` when input ends inside a block.
pub fn read_object(
    source: &mut dyn DirectiveSource,
    registry: &TypeRegistry,
) -> ConfigResult<Option<ObjectDefinition>> {
    let (opener_line, opener) = loop {
        match source.next_data_line()? {
            None => return Ok(None),
            Some((linenum, line)) => {
                if let Some(rest) = line.strip_prefix("define ") {
                    break (linenum, rest.trim().to_string());
                }
            }
        }
    };
    source.mark_block_start()?;

    let type_name = match opener.find('{') {
        Some(pos) => opener[..pos].trim().to_string(),
        None => {
            // The brace may sit alone on the following line
            match source.next_data_line()? {
                Some((_, line)) if line == "{" => opener.clone(),
                Some((linenum, _)) => {
                    return Err(ConfigError::Syntax {
                        location: location(source.source_path(), linenum),
                        message: "expected '{' to open the object definition".to_string(),
                    })
                }
                None => {
                    return Err(ConfigError::UnterminatedBlock(location(
                        source.source_path(),
                        opener_line,
                    )))
                }
            }
        }
    };
    if type_name.is_empty() {
        return Err(ConfigError::Syntax {
            location: location(source.source_path(), opener_line),
            message: "missing object type".to_string(),
        });
    }

    let mut objdef = ObjectDefinition::new(
        registry.resolve(&type_name),
        opener_line,
        source.source_path(),
    );
    loop {
        match source.next_data_line()? {
            None => {
                return Err(ConfigError::UnterminatedBlock(location(
                    source.source_path(),
                    opener_line,
                )))
            }
            Some((_, line)) if line == "}" => break,
            Some((linenum, line)) => {
                let Some((key, value)) = split_directive(&line) else {
                    return Err(ConfigError::Syntax {
                        location: location(source.source_path(), linenum),
                        message: format!("expected a directive key and value, got '{line}'"),
                    });
                };
                objdef.set_directive(key, value);
            }
        }
    }
    Ok(Some(objdef))
}

/// Split a directive line on the first run of whitespace
fn split_directive(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(char::is_whitespace)?;
    Some((key, value.trim_start()))
}

pub(crate) fn location(path: Option<&Path>, linenum: usize) -> String {
    match path {
        Some(path) => format!("{} line {linenum}", path.display()),
        None => format!("line {linenum}"),
    }
}
