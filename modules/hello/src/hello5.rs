use alloc::{string::String, vec::Vec};
use kmod::{
    Module, ModuleErr, ModuleInfo, ParamPerm, ParamResult, ParamSpec, ParamTable, ParamValues,
    Result,
};

/// Demonstrates command line argument passing to a module.
///
/// Try `myshort=-3 mystring=supercalifragilisticexpialidocious myintArray=-1,7`.
pub struct Hello5 {
    pub myshort: i16,
    pub myint: i32,
    pub mylong: i64,
    pub mystring: String,
    pub myint_array: Vec<i32>,
    pub arr_argc: usize,
}

impl Module for Hello5 {
    fn info() -> ModuleInfo {
        ModuleInfo::new("hello_5").license("GPL")
    }

    fn params() -> ParamResult<ParamTable> {
        ParamTable::builder()
            .param(
                ParamSpec::new("myshort", 1i16)
                    .perm(
                        ParamPerm::S_IRUSR
                            | ParamPerm::S_IWUSR
                            | ParamPerm::S_IRGRP
                            | ParamPerm::S_IWGRP,
                    )
                    .description("A short integer"),
            )
            .param(
                ParamSpec::new("myint", 420i32)
                    .perm(
                        ParamPerm::S_IRUSR
                            | ParamPerm::S_IWUSR
                            | ParamPerm::S_IRGRP
                            | ParamPerm::S_IROTH,
                    )
                    .description("An integer"),
            )
            .param(
                ParamSpec::new("mylong", 9999i64)
                    .perm(ParamPerm::S_IRUSR)
                    .description("A long integer"),
            )
            .param(ParamSpec::charp("mystring", "blah").description("A character string"))
            .param(
                ParamSpec::array("myintArray", [420i32, 420])
                    .description("An array of integers"),
            )
            .build()
    }

    fn init(params: &ParamValues) -> Result<Self> {
        let myint_array = params
            .array::<i32>("myintArray")
            .ok_or(ModuleErr::EINVAL)?;
        let this = Hello5 {
            myshort: params.get("myshort").ok_or(ModuleErr::EINVAL)?,
            myint: params.get("myint").ok_or(ModuleErr::EINVAL)?,
            mylong: params.get("mylong").ok_or(ModuleErr::EINVAL)?,
            mystring: params.get("mystring").ok_or(ModuleErr::EINVAL)?,
            myint_array: myint_array.elements().to_vec(),
            arr_argc: myint_array.count(),
        };

        log::info!("Hello, world 5");
        log::info!("=============");
        log::info!("myshort is a short integer: {}", this.myshort);
        log::info!("myint is an integer: {}", this.myint);
        log::info!("mylong is a long integer: {}", this.mylong);
        log::info!("mystring is a string: {}", this.mystring);
        for (i, v) in this.myint_array.iter().enumerate() {
            log::info!("myintArray[{}] = {}", i, v);
        }
        log::info!("got {} arguments for myintArray.", this.arr_argc);

        Ok(this)
    }

    fn exit(&mut self) {
        log::info!("Goodbye, world 5");
    }
}
