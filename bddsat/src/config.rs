//! Solver configuration.
use serde::Deserialize;

/// Defines [`SolverConfig`], its defaults, its help text and [`SolverConfigUpdate`] from one
/// table of options.
macro_rules! solver_config {
    ($(
        #[doc = $doc:literal]
        $name:ident: $ty:ty = $default:expr, $kind:literal;
    )*) => {
        /// Configurable parameters used during solving.
        pub struct SolverConfig {
            $(
                #[doc = $doc]
                pub $name: $ty,
            )*
        }

        impl Default for SolverConfig {
            fn default() -> SolverConfig {
                SolverConfig {
                    $($name: $default,)*
                }
            }
        }

        impl SolverConfig {
            /// Description of all options with their defaults.
            pub fn help() -> &'static str {
                concat!($(
                    stringify!($name), " = <", $kind, ">\n",
                    "   ", $doc, "\n",
                    "    (Default: ", stringify!($default), ")\n",
                )*)
            }
        }

        /// Partial update of a [`SolverConfig`].
        ///
        /// Deserializes from any subset of the option names, e.g. from a TOML file or a single
        /// `key = value` line.
        #[derive(Deserialize, Default, Debug, Clone, PartialEq, Eq)]
        #[serde(deny_unknown_fields)]
        pub struct SolverConfigUpdate {
            $(pub $name: Option<$ty>,)*
        }

        impl SolverConfigUpdate {
            /// Combine two updates, values of `other` take precedence.
            pub fn merge(&mut self, other: SolverConfigUpdate) {
                $(
                    if other.$name.is_some() {
                        self.$name = other.$name;
                    }
                )*
            }

            /// Apply the update to a configuration.
            pub fn apply(&self, config: &mut SolverConfig) {
                $(
                    if let Some($name) = self.$name {
                        config.$name = $name;
                    }
                )*
            }
        }
    };
}

solver_config! {
    /// Number of newly quantified variables that triggers a garbage collection.
    gc_threshold: usize = 10, "integer";

    /// Write comment lines describing each operation into textual LRAT proofs.
    proof_comments: bool = false, "bool";

    /// Report the number of solutions for `i` schedule instructions.
    count_solutions: bool = true, "bool";
}

impl SolverConfigUpdate {
    /// An update that changes nothing.
    pub fn new() -> SolverConfigUpdate {
        SolverConfigUpdate::default()
    }
}
