use std::collections::BTreeSet;

/// Compiler- and runtime-generated entry points that are exported by most
/// shared objects but are never meaningful fuzz targets.
///
/// ```text
/// ┌─────────────────────────────┬──────────────────────────────────┐
/// │ Symbol                      │ Origin                           │
/// ├─────────────────────────────┼──────────────────────────────────┤
/// │ _start, _init, _fini        │ process startup / teardown       │
/// │ __stack_chk_fail(_local)    │ stack protector failure handler  │
/// │ __cxa_finalize              │ C++ runtime destructor hook      │
/// │ (de)register_tm_clones      │ transactional memory scaffolding │
/// │ __do_global_dtors_aux       │ static destructor thunk          │
/// │ frame_dummy                 │ frame info registration          │
/// │ __x86.get_pc_thunk.{ax,dx}  │ 32-bit PIC helper thunks         │
/// │ __gmon_start__              │ gprof hook                       │
/// └─────────────────────────────┴──────────────────────────────────┘
/// ```
pub const DEFAULT_DENYLIST: &[&str] = &[
    "_start",
    "_init",
    "_fini",
    "__stack_chk_fail_local",
    "__stack_chk_fail",
    "__cxa_finalize",
    "deregister_tm_clones",
    "register_tm_clones",
    "__do_global_dtors_aux",
    "frame_dummy",
    "__x86.get_pc_thunk.ax",
    "__x86.get_pc_thunk.dx",
    "__gmon_start__",
];

/// Set of symbol names the extractor skips.
///
/// This is policy data: callers start from [`Denylist::default`] and
/// extend it, or build an empty one with [`Denylist::empty`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Denylist {
    names: BTreeSet<String>,
}

impl Default for Denylist {
    fn default() -> Self {
        Self {
            names: DEFAULT_DENYLIST.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Denylist {
    pub fn empty() -> Self {
        Self {
            names: BTreeSet::new(),
        }
    }

    /// Add more names to skip.
    #[must_use]
    pub fn with<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_covers_runtime_scaffolding() {
        let deny = Denylist::default();
        for name in DEFAULT_DENYLIST {
            assert!(deny.contains(name), "{name} missing from default");
        }
        assert_eq!(deny.len(), 13);
        assert!(!deny.contains("main_entry"));
    }

    #[test]
    fn extension_keeps_defaults() {
        let deny = Denylist::default().with(["internal_helper"]);
        assert!(deny.contains("internal_helper"));
        assert!(deny.contains("_init"));
    }

    #[test]
    fn empty_denies_nothing() {
        let deny = Denylist::empty();
        assert!(deny.is_empty());
        assert!(!deny.contains("_start"));
    }
}
