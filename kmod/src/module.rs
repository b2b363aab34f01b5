use crate::{ParamResult, ParamTable, ParamValues, Result};
use alloc::{
    format,
    string::String,
    vec::Vec,
};

/// A loadable component.
///
/// The loader builds the declaration table from [`params`](Module::params),
/// binds the load arguments into a fresh [`ParamValues`], and only then
/// calls [`init`](Module::init). [`exit`](Module::exit) runs once when a
/// successfully initialized instance is unloaded.
pub trait Module: Sized {
    /// The `.modinfo` entries of the component (name, license, ...).
    fn info() -> ModuleInfo;

    /// The parameters the component accepts at load time.
    fn params() -> ParamResult<ParamTable> {
        Ok(ParamTable::empty())
    }

    /// Called once with the final parameter values. Returning an error
    /// aborts the load and `exit` is never called.
    fn init(params: &ParamValues) -> Result<Self>;

    fn exit(&mut self) {}
}

/// The `key=value` pairs of a module's `.modinfo` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleInfo {
    kv: Vec<(String, String)>,
}

impl ModuleInfo {
    pub fn new(name: &str) -> Self {
        let mut info = ModuleInfo::default();
        info.add_kv("name", name);
        info
    }

    pub fn add_kv(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.kv.push((key.into(), value.into()));
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.kv
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.kv
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn name(&self) -> &str {
        self.get("name").unwrap_or("unknown")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.kv.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn license(mut self, license: &str) -> Self {
        self.add_kv("license", license);
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.add_kv("author", author);
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.add_kv("description", description);
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.add_kv("version", version);
        self
    }

    /// Append the `parm` and `parmtype` entries `modinfo` derives from a
    /// parameter table.
    pub fn with_params(mut self, table: &ParamTable) -> Self {
        for spec in table.iter() {
            if let Some(desc) = spec.desc() {
                self.add_kv("parm", format!("{}:{}", spec.name(), desc));
            }
            self.add_kv("parmtype", format!("{}:{}", spec.name(), spec.kind()));
        }
        self
    }
}

impl core::fmt::Display for ModuleInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (k, v) in self.iter() {
            writeln!(f, "{:<16}{}", format!("{}:", k), v)?;
        }
        Ok(())
    }
}
