//! Kernel name resolution
//!
//! Maps the kernel identifiers found in profiler output to canonical names:
//! demangled when they are compiler symbols, with the parameter list and the
//! bracketed instance index (`[3]`) removed, so every launch of a kernel
//! lands in the same `KernelRecord`.

use crate::error::Result;
use crate::runner::{run_checked, ExternalToolRunner};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use symbolic_common::{Language, Name, NameMangling};
use symbolic_demangle::{Demangle, DemangleOptions};
use tracing::{debug, warn};

/// Prefix of Itanium-mangled symbols
pub const MANGLING_PREFIX: &str = "_Z";

static INSTANCE_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+\]\s*$").unwrap());

/// Whether `name` looks like a compiler-mangled symbol
pub fn looks_mangled(name: &str) -> bool {
    name.trim_start().starts_with(MANGLING_PREFIX)
}

/// Canonical form of an already demangled kernel name.
///
/// Returns an empty string for rows that carry no kernel name.
pub fn canonical_kernel_name(name: &str) -> String {
    strip_parameter_list(strip_instance_index(name).trim())
        .trim()
        .to_string()
}

fn strip_instance_index(name: &str) -> &str {
    match INSTANCE_INDEX.find(name) {
        Some(m) => &name[..m.start()],
        None => name,
    }
}

/// Cut a trailing balanced `( ... )` group, unless it is the whole name
fn strip_parameter_list(name: &str) -> &str {
    if !name.ends_with(')') {
        return name;
    }

    let mut depth = 0usize;
    for (i, c) in name.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return if i == 0 { name } else { &name[..i] };
                }
            }
            _ => {}
        }
    }

    // unbalanced
    name
}

/// Demangling that did not produce a usable name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemangleWarning {
    /// The demangler ran but its output is still a mangled symbol
    Untranslated { symbol: String, output: String },

    /// The demangler output was not a single terminated line
    MalformedOutput { symbol: String, output: String },
}

impl fmt::Display for DemangleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemangleWarning::Untranslated { symbol, output } => {
                write!(f, "demangler left {} untranslated ({:?})", symbol, output)
            }
            DemangleWarning::MalformedOutput { symbol, output } => {
                write!(f, "unexpected demangler output for {}: {:?}", symbol, output)
            }
        }
    }
}

/// Turns a raw kernel identifier into its canonical name
pub trait ResolveName {
    fn resolve(&mut self, raw: &str) -> Result<String>;
}

/// Resolution without demangling, for output that is already readable
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalNames;

impl ResolveName for CanonicalNames {
    fn resolve(&mut self, raw: &str) -> Result<String> {
        Ok(canonical_kernel_name(raw))
    }
}

/// Where mangled symbols get demangled
pub enum Demangler<'a> {
    /// An external program taking one symbol argument (e.g. `c++filt`)
    External {
        runner: &'a dyn ExternalToolRunner,
        command: Vec<String>,
    },

    /// In-process demangling
    Builtin,
}

/// Demangling name resolver with a per-symbol cache
pub struct NameResolver<'a> {
    demangler: Demangler<'a>,

    /// Mangled symbol -> demangled name
    cache: HashMap<String, String>,

    warnings: Vec<DemangleWarning>,
}

impl<'a> NameResolver<'a> {
    /// Create a resolver using the given demangler
    pub fn new(demangler: Demangler<'a>) -> Self {
        Self {
            demangler,
            cache: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Resolver calling `command <symbol>` through `runner`
    pub fn external(runner: &'a dyn ExternalToolRunner, command: Vec<String>) -> Self {
        Self::new(Demangler::External { runner, command })
    }

    /// Resolver demangling in-process
    pub fn builtin() -> Self {
        Self::new(Demangler::Builtin)
    }

    /// Warnings raised so far
    pub fn warnings(&self) -> &[DemangleWarning] {
        &self.warnings
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Demangle a single symbol, falling back to the symbol itself when
    /// the demangler cannot translate it
    pub fn demangle(&mut self, symbol: &str) -> Result<String> {
        if let Some(name) = self.cache.get(symbol) {
            return Ok(name.clone());
        }

        let outcome = match &self.demangler {
            Demangler::External { runner, command } => demangle_external(*runner, command, symbol)?,
            Demangler::Builtin => demangle_builtin(symbol),
        };

        let name = match outcome {
            Ok(name) => {
                debug!("Demangled {} -> {}", symbol, name);
                name
            }
            Err(warning) => {
                warn!("{}", warning);
                self.warnings.push(warning);
                symbol.to_string()
            }
        };

        self.cache.insert(symbol.to_string(), name.clone());
        Ok(name)
    }
}

impl ResolveName for NameResolver<'_> {
    fn resolve(&mut self, raw: &str) -> Result<String> {
        let raw = strip_instance_index(raw).trim();
        if looks_mangled(raw) {
            let demangled = self.demangle(raw)?;
            Ok(canonical_kernel_name(&demangled))
        } else {
            Ok(canonical_kernel_name(raw))
        }
    }
}

fn demangle_external(
    runner: &dyn ExternalToolRunner,
    command: &[String],
    symbol: &str,
) -> Result<std::result::Result<String, DemangleWarning>> {
    let mut command_line = command.to_vec();
    command_line.push(symbol.to_string());
    let output = run_checked(runner, &command_line)?;

    let lines: Vec<&str> = output.stdout.split('\n').collect();
    let name = match lines.as_slice() {
        [line, ""] => line.trim_end_matches('\r'),
        _ => {
            return Ok(Err(DemangleWarning::MalformedOutput {
                symbol: symbol.to_string(),
                output: output.stdout.clone(),
            }))
        }
    };

    if looks_mangled(name) {
        return Ok(Err(DemangleWarning::Untranslated {
            symbol: symbol.to_string(),
            output: name.to_string(),
        }));
    }

    Ok(Ok(name.to_string()))
}

fn demangle_builtin(symbol: &str) -> std::result::Result<String, DemangleWarning> {
    let name = Name::new(symbol, NameMangling::Mangled, Language::Cpp);
    match name.demangle(DemangleOptions::name_only()) {
        Some(demangled) if !looks_mangled(&demangled) => Ok(demangled),
        other => Err(DemangleWarning::Untranslated {
            symbol: symbol.to_string(),
            output: other.unwrap_or_default(),
        }),
    }
}
