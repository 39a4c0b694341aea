pub mod choices;
pub mod clock;
pub mod codec;
pub mod config;
pub mod due;
pub mod error;
pub mod frontmatter;
pub mod repeat;
pub mod time_of_day;
pub mod weekday;

pub use crate::choices::get_repeat_choices;
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::codec::{parse_repeat, serialize_repeat, SerializedRepetition};
pub use crate::config::{RawConfig, ReviewConfig};
pub use crate::error::{ConfigError, ConfigResult};
pub use crate::frontmatter::{repetition_from_markdown, update_repetition_metadata};
pub use crate::repeat::{NextRepetition, Repeat, RepeatChoice, Repetition, ScheduleState};
