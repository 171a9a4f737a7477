//! Budget configuration.
//!
//! Embedders describe the limits for an evaluation in data (a config
//! file, a request header) and build threads from the parsed struct.

use serde::{Deserialize, Serialize};

use lark_util::{Result, SafetyFlags};

use crate::accountant::Accountant;
use crate::thread::Thread;

/// Declarative limits for one evaluation thread.
///
/// Most fields have permissive defaults: no limit and no requirement.
///
/// # Examples
///
/// ```
/// use lark_safety::BudgetConfig;
///
/// let config: BudgetConfig = serde_json::from_str(
///     r#"{ "max_steps": 10000, "max_allocs": 1048576, "require": "CM" }"#,
/// ).unwrap();
/// let thread = config.build_thread().unwrap();
/// assert_eq!(thread.accountant().max_steps(), 10000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Step budget. `None` means unmetered.
    #[serde(default)]
    pub max_steps: Option<u64>,

    /// Allocation budget in bytes. `None` means unmetered.
    #[serde(default)]
    pub max_allocs: Option<u64>,

    /// Required safety flags in compact letter form (`"CM"`, `"-"`).
    #[serde(default = "default_require")]
    pub require: String,
}

fn default_require() -> String {
    "-".to_owned()
}

impl Default for BudgetConfig {
    fn default() -> Self {
        BudgetConfig {
            max_steps: None,
            max_allocs: None,
            require: default_require(),
        }
    }
}

impl BudgetConfig {
    /// Checks the config for consistency without building anything.
    pub fn validate(&self) -> Result<()> {
        self.require.parse::<SafetyFlags>()?;
        Ok(())
    }

    /// The parsed requirement.
    pub fn required_flags(&self) -> Result<SafetyFlags> {
        self.require.parse()
    }

    /// Builds a thread enforcing this config.
    pub fn build_thread(&self) -> Result<Thread> {
        let required = self.required_flags()?;
        let accountant = Accountant::new(
            self.max_steps.unwrap_or(u64::MAX),
            self.max_allocs.unwrap_or(u64::MAX),
            required,
        );
        Ok(Thread::from_accountant(accountant))
    }
}
