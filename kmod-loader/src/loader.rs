use crate::param::{ParsedArgs, UnknownParamPolicy, parse_args, parse_tokens};
use alloc::{string::String, vec::Vec};
use core::marker::PhantomData;
use kmod::{Module, ModuleErr, ModuleInfo, ParamError, ParamTable, ParamValues};
use thiserror::Error;

/// Why a module could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Declaring the parameters or binding the arguments failed; the init
    /// function was never called.
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("{name}: init function failed with {errno:?}")]
    Init { name: String, errno: ModuleErr },
}

impl From<LoadError> for ModuleErr {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Param(err) => err.into(),
            LoadError::Init { errno, .. } => errno,
        }
    }
}

/// Loader settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderConfig {
    pub unknown: UnknownParamPolicy,
}

/// Loads instances of one module type.
///
/// The declaration table is built once in [`new`](Self::new); every load
/// gets its own parameter cells.
pub struct ModuleLoader<M: Module> {
    table: ParamTable,
    info: ModuleInfo,
    config: LoaderConfig,
    _module: PhantomData<fn() -> M>,
}

/// A loaded module: its final parameters and the initialized instance.
///
/// Only shared access to the parameters is handed out, so nothing changes
/// them once the init function has run. The exit function runs on
/// [`unload`](Self::unload), or on drop if the owner is never unloaded.
pub struct ModuleOwner<M: Module> {
    info: ModuleInfo,
    params: ParamValues,
    module: M,
    exited: bool,
    warnings: Vec<ParamError>,
    after_dashes: String,
}

impl<M: Module> ModuleOwner<M> {
    /// Get the name of the module
    pub fn name(&self) -> &str {
        self.info.name()
    }

    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    pub fn params(&self) -> &ParamValues {
        &self.params
    }

    pub fn module(&self) -> &M {
        &self.module
    }

    /// Unknown parameters that were skipped during the load.
    pub fn warnings(&self) -> &[ParamError] {
        &self.warnings
    }

    pub fn after_dashes(&self) -> &str {
        &self.after_dashes
    }

    /// Run the module's exit function and release it.
    pub fn unload(mut self) {
        self.call_exit();
    }

    fn call_exit(&mut self) {
        if self.exited {
            return;
        }
        self.exited = true;
        log::info!("Module({}) calling exit function", self.info.name());
        self.module.exit();
    }
}

impl<M: Module> Drop for ModuleOwner<M> {
    fn drop(&mut self) {
        self.call_exit();
    }
}

impl<M: Module> ModuleLoader<M> {
    /// Build the module's declaration table and modinfo.
    pub fn new() -> Result<Self, LoadError> {
        let table = M::params()?;
        let info = M::info().with_params(&table);
        log::debug!(
            "Module({}) declares {} parameter(s)",
            info.name(),
            table.len()
        );
        Ok(ModuleLoader {
            table,
            info,
            config: LoaderConfig::default(),
            _module: PhantomData,
        })
    }

    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn table(&self) -> &ParamTable {
        &self.table
    }

    /// modinfo entries, including the derived `parm`/`parmtype` lines.
    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    /// Load the module with an argument string like `"foo=1 bar=a,b"`.
    pub fn load_module(&self, args: &str) -> Result<ModuleOwner<M>, LoadError> {
        let parsed = parse_args(self.info.name(), args, &self.table, self.config.unknown)?;
        self.complete_load(parsed)
    }

    /// Load the module with arguments that are already split, one
    /// `name=value` per item.
    pub fn load_module_tokens<'t, I>(&self, tokens: I) -> Result<ModuleOwner<M>, LoadError>
    where
        I: IntoIterator<Item = &'t str>,
    {
        let parsed = parse_tokens(self.info.name(), tokens, &self.table, self.config.unknown)?;
        self.complete_load(parsed)
    }

    /// Apply the parsed arguments to fresh cells, then run the init function.
    fn complete_load(&self, mut parsed: ParsedArgs) -> Result<ModuleOwner<M>, LoadError> {
        let name = self.info.name();
        if !parsed.after_dashes.is_empty() {
            log::warn!(
                "[{}]: parameters '{}' after '--' ignored",
                name,
                parsed.after_dashes
            );
        }

        let mut params = ParamValues::new(&self.table);
        parsed.apply(&mut params)?;

        let module = M::init(&params).map_err(|errno| {
            log::error!("Module({}) init function failed: {:?}", name, errno);
            LoadError::Init {
                name: String::from(name),
                errno,
            }
        })?;

        log::info!("Module({}) loaded successfully!", name);
        Ok(ModuleOwner {
            info: self.info.clone(),
            params,
            module,
            exited: false,
            warnings: parsed.warnings,
            after_dashes: parsed.after_dashes,
        })
    }
}
