//! Extension-keyed backend registry

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::apitrace::ApiTraceBackend;
use crate::backend::{BackendContext, DumpRequest, DumpResult, ReplayBackend, trace_extension};
use crate::error::{BackendError, Result};
use crate::gfxreconstruct::GfxReconstructBackend;

/// Builds a backend for one request.
pub type BackendFactory =
    Box<dyn Fn(DumpRequest, &BackendContext) -> Result<Box<dyn ReplayBackend>> + Send + Sync>;

/// A backend and the extensions it claims.
pub struct BackendRegistration {
    pub name: &'static str,
    pub extensions: Vec<String>,
    factory: BackendFactory,
}

impl std::fmt::Debug for BackendRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistration")
            .field("name", &self.name)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

/// Maps trace extensions to backends. Built once at startup.
#[derive(Debug)]
pub struct Registry {
    context: BackendContext,
    registrations: Vec<BackendRegistration>,
}

impl Registry {
    /// An empty registry.
    pub fn new(context: BackendContext) -> Self {
        Self { context, registrations: Vec::new() }
    }

    /// The apitrace (`.trace`, `.trace-dxgi`) and GFXReconstruct (`.gfxr`)
    /// backends.
    pub fn with_default_backends(context: BackendContext) -> Result<Self> {
        let mut registry = Self::new(context);
        registry.register(ApiTraceBackend::NAME, ApiTraceBackend::EXTENSIONS, |request, ctx| {
            Ok(Box::new(ApiTraceBackend::new(request, ctx)?))
        })?;
        registry.register(
            GfxReconstructBackend::NAME,
            GfxReconstructBackend::EXTENSIONS,
            |request, ctx| Ok(Box::new(GfxReconstructBackend::new(request, ctx)?)),
        )?;
        Ok(registry)
    }

    /// Add a backend. Fails if any of `extensions` is already claimed.
    pub fn register<F>(&mut self, name: &'static str, extensions: &[&str], factory: F) -> Result<()>
    where
        F: Fn(DumpRequest, &BackendContext) -> Result<Box<dyn ReplayBackend>> + Send + Sync + 'static,
    {
        for (i, extension) in extensions.iter().enumerate() {
            let existing = match self.owner_of(extension) {
                Some(registration) => Some(registration.name),
                None if extensions[..i].contains(extension) => Some(name),
                None => None,
            };
            if let Some(existing) = existing {
                return Err(BackendError::DuplicateExtension {
                    extension: extension.to_string(),
                    existing,
                });
            }
        }

        debug!("Registered {} backend for {:?}", name, extensions);
        self.registrations.push(BackendRegistration {
            name,
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            factory: Box::new(factory),
        });
        Ok(())
    }

    pub fn context(&self) -> &BackendContext {
        &self.context
    }

    pub fn registrations(&self) -> &[BackendRegistration] {
        &self.registrations
    }

    /// Every registered extension, in registration order.
    pub fn extensions(&self) -> Vec<&str> {
        self.registrations.iter().flat_map(|r| r.extensions.iter().map(String::as_str)).collect()
    }

    /// Whether some backend handles `trace_path`.
    pub fn supports(&self, trace_path: &Path) -> bool {
        trace_extension(trace_path).is_some_and(|ext| self.owner_of(&ext).is_some())
    }

    /// Build the backend for `request`, chosen by the trace's extension.
    pub fn dispatch(&self, request: DumpRequest) -> Result<Box<dyn ReplayBackend>> {
        let registration = request
            .extension()
            .and_then(|ext| self.owner_of(&ext))
            .ok_or_else(|| BackendError::NotImplemented { path: request.trace_path.clone() })?;

        info!("Dispatching {} to the {} backend", request.trace_path.display(), registration.name);
        (registration.factory)(request, &self.context)
    }

    /// Dispatch and dump in one step.
    pub fn dump(
        &self,
        trace_path: impl Into<PathBuf>,
        output_dir: Option<PathBuf>,
        calls: Vec<String>,
    ) -> Result<DumpResult> {
        let request = DumpRequest { trace_path: trace_path.into(), output_dir, calls };
        let mut backend = self.dispatch(request)?;
        Ok(backend.dump_result())
    }

    fn owner_of(&self, extension: &str) -> Option<&BackendRegistration> {
        self.registrations.iter().find(|r| r.extensions.iter().any(|e| e == extension))
    }
}
