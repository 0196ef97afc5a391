//! Engine trait for nal2-core
//!
//! [`NalEngine`] is the seam to the external prescription engine. The engine
//! keeps internal state between calls (individual transforms, client
//! profile, bandwidth correction) and is not safe for concurrent entry:
//! every method takes `&mut self` and callers serialize access.

use crate::Result;

/// Frequency resolution of the per-band transform tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bands {
    /// 19 third-octave bands, 125 Hz to 8 kHz
    Nineteen,
    /// 9 audiometric frequencies, 250 Hz to 8 kHz
    Nine,
}

impl Bands {
    pub fn count(self) -> usize {
        match self {
            Bands::Nineteen => 19,
            Bands::Nine => 9,
        }
    }
}

/// Hearing thresholds of the fitted ear and, for bilateral fittings, the other ear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Audiogram<'a> {
    pub ac: &'a [f64],
    pub bc: &'a [f64],
    pub ac_other: &'a [f64],
}

/// Fitting options shared by most gain calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fitting {
    pub limiting: i32,
    pub channels: i32,
    pub direction: i32,
    pub mic: i32,
    pub no_of_aids: i32,
}

/// Device and acoustic coupling description used for coupler/simulator targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coupling {
    pub target: i32,
    pub aid_type: i32,
    pub tubing: i32,
    pub vent: i32,
    pub recd_meas_type: i32,
}

/// Level range of an input/output curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveRange {
    pub graph_freq: i32,
    pub start_level: i32,
    pub finish_level: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressionThresholdQuery<'a> {
    pub band_width: i32,
    pub selection: i32,
    pub wbct: i32,
    pub aid_type: i32,
    pub direction: i32,
    pub mic: i32,
    pub calc_ch: &'a [i32],
}

/// Inputs of the real-ear-to-coupler difference tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecdQuery {
    pub recd_meas_type: i32,
    pub date_of_birth: i32,
    pub aid_type: i32,
    pub tubing: i32,
    /// Only used by the total (`RECDt`) table
    pub vent: i32,
    /// Only used by the total (`RECDt`) table
    pub earpiece: i32,
    pub coupler: i32,
    pub fitting_depth: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainAtQuery<'a> {
    pub freq_required: i32,
    pub target_type: i32,
    pub audiogram: Audiogram<'a>,
    pub level: f64,
    pub fitting: Fitting,
    pub band_width: i32,
    pub coupling: Coupling,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiiQuery<'a> {
    pub n_comp_speed: i32,
    pub speech_thresh: &'a [f64],
    pub s: i32,
    pub reag: &'a [f64],
    pub reag_plus: &'a [f64],
    pub reag_minus: &'a [f64],
    pub reur: &'a [f64],
}

/// Client profile settings that influence later prescriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSetting {
    AdultChild { adult_child: i32, date_of_birth: i32 },
    Experience(i32),
    CompSpeed(i32),
    TonalLanguage(i32),
    Gender(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossOverFrequencies {
    pub cf_array: Vec<f64>,
    pub freq_in_ch: Vec<i32>,
}

/// A gain curve with its per-band line type.
#[derive(Debug, Clone, PartialEq)]
pub struct LinedGain {
    pub gain: Vec<f64>,
    pub line_type: Vec<i32>,
}

/// Input/output curve with and without output limiting.
#[derive(Debug, Clone, PartialEq)]
pub struct IoCurve {
    pub io: Vec<f64>,
    pub io_unlimited: Vec<f64>,
    /// Empty for real-ear curves
    pub line_type: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechOGram {
    pub rms: Vec<f64>,
    pub max: Vec<f64>,
    pub min: Vec<f64>,
    pub thresh: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnValues {
    pub maf: Vec<f64>,
    pub bwc: Vec<f64>,
    pub escd: Vec<f64>,
}

/// Typed operations of the prescription engine.
pub trait NalEngine: Send {
    /// `(major, minor)` version reported by the engine
    fn dll_version(&mut self) -> Result<(i32, i32)>;

    fn real_ear_insertion_gain(&mut self, audiogram: Audiogram<'_>, level: f64, fitting: Fitting) -> Result<Vec<f64>>;

    fn real_ear_aided_gain(&mut self, audiogram: Audiogram<'_>, level: f64, fitting: Fitting) -> Result<Vec<f64>>;

    fn tcc_coupler_gain(
        &mut self,
        audiogram: Audiogram<'_>,
        level: f64,
        fitting: Fitting,
        coupling: Coupling,
    ) -> Result<LinedGain>;

    fn ear_simulator_gain(
        &mut self,
        audiogram: Audiogram<'_>,
        level: f64,
        fitting: Fitting,
        coupling: Coupling,
    ) -> Result<LinedGain>;

    fn cross_over_frequencies(&mut self, channels: i32, ac: &[f64], bc: &[f64]) -> Result<CrossOverFrequencies>;

    fn center_frequencies(&mut self, channels: i32, cf_array: &[f64]) -> Result<Vec<i32>>;

    /// Set the bandwidth correction used by later calculations
    fn set_bwc(&mut self, channels: i32, cross_over: &[f64]) -> Result<()>;

    fn compression_threshold(&mut self, query: CompressionThresholdQuery<'_>) -> Result<Vec<f64>>;

    fn compression_ratio(
        &mut self,
        centre_freq: &[i32],
        audiogram: Audiogram<'_>,
        fitting: Fitting,
    ) -> Result<Vec<f64>>;

    fn mpo(&mut self, mpo_type: i32, ac: &[f64], bc: &[f64], channels: i32, limiting: i32) -> Result<Vec<f64>>;

    fn real_ear_io_curve(
        &mut self,
        audiogram: Audiogram<'_>,
        range: CurveRange,
        fitting: Fitting,
        target: i32,
    ) -> Result<IoCurve>;

    fn tcc_io_curve(
        &mut self,
        audiogram: Audiogram<'_>,
        range: CurveRange,
        fitting: Fitting,
        coupling: Coupling,
    ) -> Result<IoCurve>;

    fn ear_simulator_io_curve(
        &mut self,
        audiogram: Audiogram<'_>,
        range: CurveRange,
        fitting: Fitting,
        coupling: Coupling,
    ) -> Result<IoCurve>;

    fn speech_o_gram(&mut self, audiogram: Audiogram<'_>, level: f64, fitting: Fitting) -> Result<SpeechOGram>;

    fn aided_threshold(
        &mut self,
        audiogram: Audiogram<'_>,
        ct: &[f64],
        db_option: i32,
        fitting: Fitting,
    ) -> Result<Vec<f64>>;

    fn redd(&mut self, def_values: i32, bands: Bands) -> Result<Vec<f64>>;

    fn set_redd(&mut self, redd: &[f64], def_values: i32, bands: Bands) -> Result<()>;

    fn reur(&mut self, def_values: i32, date_of_birth: i32, direction: i32, mic: i32, bands: Bands) -> Result<Vec<f64>>;

    fn set_reur(
        &mut self,
        reur: &[f64],
        def_values: i32,
        date_of_birth: i32,
        direction: i32,
        mic: i32,
        bands: Bands,
    ) -> Result<()>;

    /// Real-ear-to-coupler difference of the hearing aid only
    fn recdh(&mut self, query: RecdQuery, bands: Bands) -> Result<Vec<f64>>;

    fn set_recdh(&mut self, recdh: &[f64], bands: Bands) -> Result<()>;

    /// Real-ear-to-coupler difference including vent and earpiece
    fn recdt(&mut self, query: RecdQuery, bands: Bands) -> Result<Vec<f64>>;

    fn set_recdt(&mut self, recdt: &[f64], bands: Bands) -> Result<()>;

    fn apply_setting(&mut self, setting: ClientSetting) -> Result<()>;

    fn gain_at(&mut self, query: GainAtQuery<'_>) -> Result<f64>;

    /// Microphone location effect
    fn mle(&mut self, aid_type: i32, direction: i32, mic: i32) -> Result<Vec<f64>>;

    fn return_values(&mut self) -> Result<ReturnValues>;

    fn tubing(&mut self, tubing: i32, bands: Bands) -> Result<Vec<f64>>;

    fn vent_out(&mut self, vent: i32, bands: Bands) -> Result<Vec<f64>>;

    /// Speech intelligibility for a given aided gain and limit
    fn speech_intelligibility(&mut self, s: i32, reag: &[f64], limit: &[f64]) -> Result<f64>;

    fn speech_intelligibility_index(&mut self, query: SiiQuery<'_>) -> Result<f64>;
}
