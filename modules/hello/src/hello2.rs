use kmod::{Module, ModuleInfo, ParamValues, Result};

pub struct Hello2;

impl Module for Hello2 {
    fn info() -> ModuleInfo {
        ModuleInfo::new("hello_2")
            .license("GPL")
            .description("Init and exit functions under their own names")
    }

    fn init(_params: &ParamValues) -> Result<Self> {
        log::info!("Hello, world 2");
        Ok(Hello2)
    }

    fn exit(&mut self) {
        log::info!("Goodbye, world 2");
    }
}
