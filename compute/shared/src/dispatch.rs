//! Mapping from stencil identifiers to kernels

use crate::{Error, Stencil};
use std::{collections::HashMap, fmt};

/// Kernel of a variant, running one stencil once over the whole domain
pub type Kernel<V> = fn(&mut V);

/// Capability table of a variant
///
/// Built once when the variant is constructed. Construction fails unless
/// every stencil of the family has exactly one kernel, so lookups by
/// identifier cannot fail afterwards.
pub struct KernelTable<S: Stencil, V> {
    kernels: HashMap<S, Kernel<V>>,
}
//
impl<S: Stencil, V> KernelTable<S, V> {
    /// Build a table, checking it against the full stencil family
    pub fn new(entries: impl IntoIterator<Item = (S, Kernel<V>)>) -> Result<Self, Error> {
        let mut kernels = HashMap::new();
        for (stencil, kernel) in entries {
            if kernels.insert(stencil, kernel).is_some() {
                return Err(Error::DuplicateKernel(stencil.name()));
            }
        }
        let missing = (S::ALL.iter())
            .filter(|stencil| !kernels.contains_key(*stencil))
            .map(|stencil| stencil.name())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(Error::IncompleteKernelTable { missing });
        }
        Ok(Self { kernels })
    }

    /// Kernel of a stencil
    pub fn get(&self, stencil: S) -> Kernel<V> {
        self.kernels[&stencil]
    }

    /// Resolve a stencil by name
    pub fn resolve(&self, name: &str) -> Result<(S, Kernel<V>), Error> {
        let stencil = name.parse::<S>()?;
        Ok((stencil, self.get(stencil)))
    }
}
//
impl<S: Stencil, V> fmt::Debug for KernelTable<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(S::ALL.iter().map(|stencil| stencil.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::BasicStencil;

    #[derive(Default)]
    struct Recorder(Vec<&'static str>);

    fn record_copy(r: &mut Recorder) {
        r.0.push("copy");
    }

    fn record_other(r: &mut Recorder) {
        r.0.push("other");
    }

    fn entries() -> Vec<(BasicStencil, Kernel<Recorder>)> {
        BasicStencil::ALL
            .iter()
            .map(|&stencil| {
                let kernel: Kernel<Recorder> = if stencil == BasicStencil::Copy {
                    record_copy
                } else {
                    record_other
                };
                (stencil, kernel)
            })
            .collect()
    }

    #[test]
    fn complete_table_dispatches() {
        let table = KernelTable::new(entries()).unwrap();
        let mut recorder = Recorder::default();
        table.get(BasicStencil::Copy)(&mut recorder);
        let (stencil, kernel) = table.resolve("avgk").unwrap();
        assert_eq!(stencil, BasicStencil::AvgK);
        kernel(&mut recorder);
        assert_eq!(recorder.0, ["copy", "other"]);
    }

    #[test]
    fn unknown_name_fails_at_lookup() {
        let table = KernelTable::new(entries()).unwrap();
        assert_eq!(
            table.resolve("avgl").err(),
            Some(Error::UnknownStencil("avgl".to_owned()))
        );
    }

    #[test]
    fn partial_table_is_rejected() {
        let mut entries = entries();
        entries.retain(|(stencil, _)| {
            !matches!(stencil, BasicStencil::SumJ | BasicStencil::LapIj)
        });
        assert_eq!(
            KernelTable::new(entries).err(),
            Some(Error::IncompleteKernelTable {
                missing: vec!["sumj", "lapij"]
            })
        );
    }

    #[test]
    fn duplicate_entry_is_rejected() {
        let mut entries = entries();
        entries.push((BasicStencil::CopyK, record_copy));
        assert_eq!(
            KernelTable::new(entries).err(),
            Some(Error::DuplicateKernel("copyk"))
        );
    }
}
