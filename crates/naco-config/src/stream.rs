//! Read-only object definition stream over any buffered reader

use std::io::BufRead;

use crate::error::ConfigResult;
use crate::lines::{clean, LineReader};
use crate::object::ObjectDefinition;
use crate::parser::{read_object, DirectiveSource};
use crate::registry::TypeRegistry;

/// Lazy object definition reader, e.g. over stdin or an in-memory buffer.
///
/// Query-only: for rewriting files, use [`crate::ConfigFile`].
pub struct ConfigStream<R> {
    source: StreamSource<R>,
    registry: TypeRegistry,
}

struct StreamSource<R> {
    lines: LineReader<R>,
}

impl<R: BufRead> DirectiveSource for StreamSource<R> {
    fn next_data_line(&mut self) -> ConfigResult<Option<(usize, String)>> {
        while let Some((linenum, raw)) = self.lines.next_raw()? {
            let data = clean(&raw);
            if !data.is_empty() {
                return Ok(Some((linenum, data.to_string())));
            }
        }
        Ok(None)
    }
}

impl<R: BufRead> ConfigStream<R> {
    pub fn new(reader: R, registry: TypeRegistry) -> Self {
        ConfigStream {
            source: StreamSource {
                lines: LineReader::new(reader),
            },
            registry,
        }
    }

    /// Parse the next object definition, or `None` at end of input
    ///
    /// # Errors
    /// Propagates parse and read failures.
    pub fn read_object(&mut self) -> ConfigResult<Option<ObjectDefinition>> {
        read_object(&mut self.source, &self.registry)
    }
}
