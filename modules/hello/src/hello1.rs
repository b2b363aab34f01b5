use kmod::{Module, ModuleInfo, ParamValues, Result};

/// The simplest module: a greeting on load and one on unload.
pub struct Hello1;

impl Module for Hello1 {
    fn info() -> ModuleInfo {
        ModuleInfo::new("hello_1").license("GPL")
    }

    fn init(_params: &ParamValues) -> Result<Self> {
        log::info!("Hello world 1.");
        Ok(Hello1)
    }

    fn exit(&mut self) {
        log::info!("Goodbye world 1.");
    }
}
