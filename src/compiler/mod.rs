//! Ahead-of-time service compiler
//!
//! The compiler walks every binding of a [`Container`] once and emits one
//! resolver method per service. Methods are plain IR, executed directly by a
//! [`CompiledContainer`] or printed as Rust source for inclusion in a build.
//!
//! # Example
//!
//! ```rust
//! use service_container::{Binding, Compiler, CompilerOptions, Container, Value};
//!
//! let container = Container::new();
//! container.singleton("config", Binding::array([("debug", true)]));
//!
//! let compiler = Compiler::with_options(CompilerOptions::new().container_name("AppContainer"));
//! let artifact = compiler.compile(&container).unwrap();
//! assert!(artifact.method_mapping.contains_key("config"));
//!
//! let source = compiler.dump(&artifact);
//! assert!(source.contains("\"AppContainer\""));
//!
//! let compiled = compiler.build(&container).unwrap();
//! assert_eq!(compiled.get("config").unwrap(), Value::array([("debug", true)]));
//! ```

mod context;
pub mod helper;
pub mod ir;
mod printer;
mod strategy;

pub use context::CompilationContext;
pub use ir::{Block, CompiledArtifact, Expr, Method, Stmt};
pub use printer::render;
pub use strategy::Strategy;

use crate::container::CONTAINER_ID;
use crate::{CompileError, CompiledContainer, Container};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[cfg(feature = "logging")]
use tracing::{debug, info};

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    container_name: String,
    hash_length: usize,
    removed_ids: BTreeSet<String>,
    output: Option<PathBuf>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            container_name: "CompiledServiceContainer".to_string(),
            hash_length: helper::DEFAULT_HASH_LENGTH,
            removed_ids: BTreeSet::new(),
            output: None,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name recorded in the generated container
    pub fn container_name(mut self, name: impl Into<String>) -> Self {
        self.container_name = name.into();
        self
    }

    /// Hex characters kept from the id digest, clamped to 8..=64
    pub fn hash_length(mut self, length: usize) -> Self {
        self.hash_length = length.clamp(helper::MIN_HASH_LENGTH, helper::MAX_HASH_LENGTH);
        self
    }

    /// Exclude an id from compilation and hide it from the compiled container
    pub fn remove_id(mut self, id: impl Into<String>) -> Self {
        self.removed_ids.insert(id.into());
        self
    }

    /// Write generated source here when building
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    #[inline]
    pub fn get_container_name(&self) -> &str {
        &self.container_name
    }

    #[inline]
    pub fn get_hash_length(&self) -> usize {
        self.hash_length
    }

    #[inline]
    pub fn removed_ids(&self) -> &BTreeSet<String> {
        &self.removed_ids
    }

    #[inline]
    pub fn get_output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

/// Compiles a container's bindings into a [`CompiledArtifact`]
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile every binding of `container`.
    ///
    /// Locks the container: the artifact is only valid for the bindings it
    /// was compiled from. Fails on the first binding that cannot be compiled.
    pub fn compile(&self, container: &Container) -> Result<CompiledArtifact, CompileError> {
        container.lock();

        let mut artifact = CompiledArtifact {
            container_name: self.options.container_name.clone(),
            ..Default::default()
        };

        for (id, binding) in container.bindings() {
            if self.options.removed_ids.contains(&id) {
                #[cfg(feature = "logging")]
                debug!(target: "service_container", service = %id, "Skipping removed service");
                continue;
            }

            let name = helper::method_name(&id, self.options.hash_length);
            if let Some(existing) = artifact.methods.get(&name) {
                return Err(CompileError::HashCollision {
                    method: name,
                    first: existing.id.clone(),
                    second: id,
                });
            }

            let mut ctx = CompilationContext::new(container, &self.options, &id);
            let strategy = Strategy::for_binding(&binding);
            let base = strategy.compile(&binding, &mut ctx)?;
            let tail = helper::compile_extend(&id, base, binding.extenders().len(), binding.is_shared());
            let (body, synthetic) = ctx.finish(tail);

            #[cfg(feature = "logging")]
            debug!(
                target: "service_container",
                service = %id,
                method = %name,
                strategy = ?strategy,
                statements = body.stmts.len(),
                "Compiled service"
            );

            artifact.synthetic_ids.extend(synthetic);
            if binding.is_shared() {
                artifact.uninitialized_services.insert(id.clone());
            }
            artifact.method_mapping.insert(id.clone(), name.clone());
            artifact.methods.insert(
                name.clone(),
                Method {
                    name,
                    id,
                    shared: binding.is_shared(),
                    body,
                },
            );
        }

        artifact.removed_ids = self.options.removed_ids.clone();
        if container.binding(CONTAINER_ID).is_none() {
            artifact.removed_ids.insert(CONTAINER_ID.to_string());
        }

        artifact.parameters = container
            .parameters()
            .into_iter()
            .filter(|(_, value)| value.is_literal())
            .collect();

        #[cfg(feature = "logging")]
        info!(
            target: "service_container",
            container = %artifact.container_name,
            services = artifact.methods.len(),
            removed = artifact.removed_ids.len(),
            synthetic = artifact.synthetic_ids.len(),
            "Container compiled"
        );

        Ok(artifact)
    }

    /// Generated Rust source of an artifact
    #[inline]
    pub fn dump(&self, artifact: &CompiledArtifact) -> String {
        render(artifact)
    }

    /// Write the generated source of an artifact to `path`
    pub fn write(&self, artifact: &CompiledArtifact, path: impl AsRef<Path>) -> Result<(), CompileError> {
        let path = path.as_ref();
        std::fs::write(path, self.dump(artifact))?;

        #[cfg(feature = "logging")]
        debug!(target: "service_container", path = %path.display(), "Wrote compiled container");

        Ok(())
    }

    /// Compile `container` and write the generated source to `path`
    pub fn compile_to_file(
        &self,
        container: &Container,
        path: impl AsRef<Path>,
    ) -> Result<CompiledArtifact, CompileError> {
        let artifact = self.compile(container)?;
        self.write(&artifact, path)?;
        Ok(artifact)
    }

    /// Compile `container` into a ready [`CompiledContainer`].
    ///
    /// Writes the generated source as well when an output path is configured.
    pub fn build(&self, container: &Container) -> Result<CompiledContainer, CompileError> {
        let artifact = self.compile(container)?;
        if let Some(path) = &self.options.output {
            self.write(&artifact, path)?;
        }
        Ok(CompiledContainer::new(artifact, container.clone()))
    }
}
