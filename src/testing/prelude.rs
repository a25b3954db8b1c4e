pub use super::{clock::*, coordinator::*};

pub use function_name::named;
pub use serde_diff::{Apply, Diff, SerdeDiff};
pub use serial_test::serial;
pub use tracing::*;

use crate::environment::{Environment, Parameters};

lazy_static! {
    pub static ref TEST_ENVIRONMENT: Environment = Environment::Test(Parameters::Default);
}
