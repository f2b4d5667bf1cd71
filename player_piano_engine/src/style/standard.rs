// The default style: the plain weather-driven piano.
//
// Every mood may layer on, the scale may wander across the whole table, and
// the tick chooses among single notes, chords and counterpoint.

use player_piano_protocol::Scale;

use super::{Style, StyleProfile};
use crate::mode::ScalePolicy;
use crate::mood::Mood;
use crate::params::ParameterBundle;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StandardProfile;

impl StyleProfile for StandardProfile {
    fn style(&self) -> Style {
        Style::Default
    }

    fn scale_policy(&self) -> ScalePolicy {
        ScalePolicy::drifting(Scale::Major, &Scale::ALL)
    }

    fn moods(&self) -> &'static [Mood] {
        &Mood::ALL
    }

    fn base_parameters(&self) -> ParameterBundle {
        ParameterBundle::default()
    }
}
