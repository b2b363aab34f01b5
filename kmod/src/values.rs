use crate::param::{KernelParamValue, ParamValue};
use crate::table::{ParamSpec, ParamTable};
use crate::{ParamError, ParamResult};
use alloc::{format, string::String, vec::Vec};

/// A typed copy of an array parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayView<T> {
    elements: Vec<T>,
    count: usize,
}

impl<T> ArrayView<T> {
    /// Every slot, up to the declared capacity.
    pub fn elements(&self) -> &[T] {
        &self.elements
    }

    /// Only the slots the loader wrote.
    pub fn supplied(&self) -> &[T] {
        &self.elements[..self.count]
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.elements.len()
    }
}

/// The parameter cells of one component instance.
///
/// Cells start out holding the declared defaults. The loader commits
/// parsed arguments through [`commit`](Self::commit) before the component
/// is initialized; after that only shared references are handed out.
#[derive(Debug, Clone)]
pub struct ParamValues {
    table: ParamTable,
    cells: Vec<ParamValue>,
}

impl ParamValues {
    pub fn new(table: &ParamTable) -> Self {
        ParamValues {
            table: table.clone(),
            cells: table.iter().map(|s| s.default_value().clone()).collect(),
        }
    }

    pub fn table(&self) -> &ParamTable {
        &self.table
    }

    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        let (idx, _) = self.table.find(name)?;
        self.cells.get(idx)
    }

    /// Read a scalar parameter as `T`. `None` if the name is not declared
    /// or the cell holds a different type.
    pub fn get<T: KernelParamValue>(&self, name: &str) -> Option<T> {
        T::from_value(self.value(name)?)
    }

    /// Read an array parameter with elements of type `T`.
    pub fn array<T: KernelParamValue>(&self, name: &str) -> Option<ArrayView<T>> {
        let ParamValue::Array(array) = self.value(name)? else {
            return None;
        };
        let elements = array
            .elements()
            .iter()
            .map(T::from_value)
            .collect::<Option<Vec<T>>>()?;
        Some(ArrayView {
            elements,
            count: array.count(),
        })
    }

    /// Whether the cell still equals its declared default.
    pub fn is_default(&self, name: &str) -> Option<bool> {
        let (idx, spec) = self.table.find(name)?;
        Some(&self.cells[idx] == spec.default_value())
    }

    /// Render a parameter the way reading its sysfs file would.
    pub fn show(&self, name: &str) -> Option<String> {
        let mut buf = String::new();
        self.value(name)?.format(&mut buf);
        buf.push('\n');
        Some(buf)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParamSpec, &ParamValue)> + '_ {
        self.table.iter().zip(self.cells.iter())
    }

    /// Parameters with non-empty permission bits, i.e. the ones listed
    /// under `/sys/module/<name>/parameters`, with their rendered value.
    pub fn visible(&self) -> impl Iterator<Item = (&ParamSpec, String)> + '_ {
        self.iter()
            .filter(|(spec, _)| !spec.permissions().is_empty())
            .map(|(spec, value)| {
                let mut buf = String::new();
                value.format(&mut buf);
                (spec, buf)
            })
    }

    /// Store a batch of values by table index.
    ///
    /// Every entry is checked against its declaration before any cell is
    /// written, so either all of them land or none do.
    pub fn commit<I>(&mut self, staged: I) -> ParamResult<()>
    where
        I: IntoIterator<Item = (usize, ParamValue)>,
    {
        let staged: Vec<(usize, ParamValue)> = staged.into_iter().collect();
        for (idx, value) in &staged {
            let spec = self.table.get(*idx).ok_or_else(|| ParamError::Unknown {
                name: format!("#{}", idx),
            })?;
            if !spec.kind().accepts(value) {
                return Err(ParamError::TypeCoercion {
                    name: String::from(spec.name()),
                    value: format!("{}", value),
                    kind: "mismatched kind",
                });
            }
        }
        for (idx, value) in staged {
            self.cells[idx] = value;
        }
        Ok(())
    }
}
