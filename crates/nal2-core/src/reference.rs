//! Deterministic in-process engine.
//!
//! [`ReferenceEngine`] stands in for the vendor prescription engine when
//! none is linked. It follows a simple half-gain rule so results are stable
//! and plausible enough for integration tests and demos, and it keeps the
//! same per-session state the real engine keeps (individual transforms,
//! client profile, bandwidth correction). It is not a clinical prescription.

use crate::engine::{
    Audiogram, Bands, ClientSetting, CompressionThresholdQuery, Coupling, CrossOverFrequencies,
    CurveRange, Fitting, GainAtQuery, IoCurve, LinedGain, NalEngine, RecdQuery, ReturnValues,
    SiiQuery, SpeechOGram,
};
use crate::{CallError, Result};

/// Third-octave band centres, 125 Hz to 8 kHz.
pub const BANDS_19: [f64; 19] = [
    125.0, 160.0, 200.0, 250.0, 315.0, 400.0, 500.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0,
    2500.0, 3150.0, 4000.0, 5000.0, 6300.0, 8000.0,
];

/// Audiometric frequencies, 250 Hz to 8 kHz.
pub const BANDS_9: [f64; 9] = [250.0, 500.0, 1000.0, 1500.0, 2000.0, 3000.0, 4000.0, 6000.0, 8000.0];

const MAX_CHANNELS: i32 = 18;
const REFERENCE_LEVEL: f64 = 65.0;

#[derive(Debug, Clone, Default)]
struct Profile {
    adult_child: i32,
    date_of_birth: i32,
    experience: i32,
    comp_speed: i32,
    tonal: i32,
    gender: i32,
}

/// Placeholder engine with deterministic outputs.
#[derive(Debug, Clone)]
pub struct ReferenceEngine {
    version: (i32, i32),
    redd: Option<Vec<f64>>,
    reur: Option<Vec<f64>>,
    recdh: Option<Vec<f64>>,
    recdt: Option<Vec<f64>>,
    bwc: Vec<f64>,
    profile: Profile,
}

impl Default for ReferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceEngine {
    pub fn new() -> Self {
        Self {
            version: (1, 0),
            redd: None,
            reur: None,
            recdh: None,
            recdt: None,
            bwc: Vec::new(),
            profile: Profile::default(),
        }
    }

    /// Report a different `(major, minor)` from `dllVersion`.
    pub fn with_version(mut self, major: i32, minor: i32) -> Self {
        self.version = (major, minor);
        self
    }

    fn insertion_gain(&self, audiogram: &Audiogram<'_>, level: f64, fitting: &Fitting) -> Vec<f64> {
        let level_offset = (level - REFERENCE_LEVEL) * 0.3;
        let binaural = if fitting.no_of_aids > 1 { 2.0 } else { 0.0 };
        let experience = if self.profile.experience == 0 { 1.0 } else { 0.0 };
        let profile = f64::from(self.profile.tonal) * 0.5 + f64::from(self.profile.gender) * 0.5;
        audiogram
            .ac
            .iter()
            .enumerate()
            .map(|(i, ac)| {
                let bc = audiogram.bc.get(i).copied().unwrap_or(*ac);
                let conductive = ((ac - bc).max(0.0)) * 0.25;
                let gain = ac * 0.46 + conductive - level_offset - binaural - experience - profile;
                round1(gain.max(0.0))
            })
            .collect()
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn table(bands: Bands) -> &'static [f64] {
    match bands {
        Bands::Nineteen => &BANDS_19,
        Bands::Nine => &BANDS_9,
    }
}

fn check_bands(key: &str, values: &[f64], bands: Bands) -> Result<()> {
    if values.len() != bands.count() {
        return Err(CallError::Engine(format!(
            "{} requires {} values, got {}",
            key,
            bands.count(),
            values.len()
        )));
    }
    Ok(())
}

fn check_channels(channels: i32) -> Result<usize> {
    if !(1..=MAX_CHANNELS).contains(&channels) {
        return Err(CallError::Engine(format!("invalid channel count: {}", channels)));
    }
    Ok(channels as usize)
}

/// Shape a per-band table by frequency with a tilt in dB per octave.
fn tilt(bands: Bands, base: f64, per_octave: f64) -> Vec<f64> {
    table(bands)
        .iter()
        .map(|f| round1(base + per_octave * (f / 1000.0).log2()))
        .collect()
}

impl NalEngine for ReferenceEngine {
    fn dll_version(&mut self) -> Result<(i32, i32)> {
        Ok(self.version)
    }

    fn real_ear_insertion_gain(&mut self, audiogram: Audiogram<'_>, level: f64, fitting: Fitting) -> Result<Vec<f64>> {
        Ok(self.insertion_gain(&audiogram, level, &fitting))
    }

    fn real_ear_aided_gain(&mut self, audiogram: Audiogram<'_>, level: f64, fitting: Fitting) -> Result<Vec<f64>> {
        let reur = self.reur.clone().unwrap_or_else(|| tilt(Bands::Nineteen, 8.0, 2.0));
        Ok(self
            .insertion_gain(&audiogram, level, &fitting)
            .into_iter()
            .enumerate()
            .map(|(i, g)| round1(g + reur.get(i).copied().unwrap_or(0.0)))
            .collect())
    }

    fn tcc_coupler_gain(
        &mut self,
        audiogram: Audiogram<'_>,
        level: f64,
        fitting: Fitting,
        coupling: Coupling,
    ) -> Result<LinedGain> {
        let offset = (f64::from(coupling.tubing) + f64::from(coupling.vent)) * 0.5;
        let gain: Vec<f64> = self
            .insertion_gain(&audiogram, level, &fitting)
            .into_iter()
            .map(|g| round1(g - offset))
            .collect();
        let line_type = vec![coupling.target; gain.len()];
        Ok(LinedGain { gain, line_type })
    }

    fn ear_simulator_gain(
        &mut self,
        audiogram: Audiogram<'_>,
        level: f64,
        fitting: Fitting,
        coupling: Coupling,
    ) -> Result<LinedGain> {
        let mut result = self.tcc_coupler_gain(audiogram, level, fitting, coupling)?;
        for g in &mut result.gain {
            *g = round1(*g + 3.0);
        }
        Ok(result)
    }

    fn cross_over_frequencies(&mut self, channels: i32, _ac: &[f64], _bc: &[f64]) -> Result<CrossOverFrequencies> {
        let channels = check_channels(channels)?;
        // crossovers spread geometrically between 500 Hz and 4 kHz
        let cf_array: Vec<f64> = (1..channels)
            .map(|i| {
                let position = i as f64 / channels as f64;
                (500.0 * 8f64.powf(position)).round()
            })
            .collect();
        let freq_in_ch = BANDS_19
            .iter()
            .map(|f| cf_array.iter().filter(|cf| *f >= **cf).count() as i32)
            .collect();
        Ok(CrossOverFrequencies { cf_array, freq_in_ch })
    }

    fn center_frequencies(&mut self, channels: i32, cf_array: &[f64]) -> Result<Vec<i32>> {
        let channels = check_channels(channels)?;
        let mut edges = Vec::with_capacity(channels + 1);
        edges.push(BANDS_19[0]);
        edges.extend(cf_array.iter().copied().take(channels - 1));
        edges.push(BANDS_19[18]);
        Ok(edges
            .windows(2)
            .map(|pair| (pair[0] * pair[1]).sqrt().round() as i32)
            .collect())
    }

    fn set_bwc(&mut self, channels: i32, cross_over: &[f64]) -> Result<()> {
        check_channels(channels)?;
        self.bwc = cross_over.iter().map(|f| round1(10.0 * (f / 1000.0).log10())).collect();
        Ok(())
    }

    fn compression_threshold(&mut self, query: CompressionThresholdQuery<'_>) -> Result<Vec<f64>> {
        let base = if query.wbct > 0 { f64::from(query.wbct) } else { 52.0 };
        Ok(query
            .calc_ch
            .iter()
            .map(|ch| round1(base - f64::from(*ch) * 0.5 - f64::from(query.direction)))
            .collect())
    }

    fn compression_ratio(
        &mut self,
        centre_freq: &[i32],
        audiogram: Audiogram<'_>,
        _fitting: Fitting,
    ) -> Result<Vec<f64>> {
        let mean_loss = if audiogram.ac.is_empty() {
            0.0
        } else {
            audiogram.ac.iter().sum::<f64>() / audiogram.ac.len() as f64
        };
        let speed = if self.profile.comp_speed == 0 { 0.0 } else { 0.2 };
        Ok(centre_freq
            .iter()
            .map(|_| round1(1.0 + mean_loss / 60.0 + speed))
            .collect())
    }

    fn mpo(&mut self, _mpo_type: i32, ac: &[f64], bc: &[f64], _channels: i32, limiting: i32) -> Result<Vec<f64>> {
        let ceiling = if limiting == 0 { 130.0 } else { 120.0 };
        Ok(ac
            .iter()
            .zip(bc.iter().chain(std::iter::repeat(&0.0)))
            .map(|(ac, bc)| round1((90.0 + 0.3 * ac + 0.1 * (ac - bc).max(0.0)).min(ceiling)))
            .collect())
    }

    fn real_ear_io_curve(
        &mut self,
        audiogram: Audiogram<'_>,
        range: CurveRange,
        fitting: Fitting,
        _target: i32,
    ) -> Result<IoCurve> {
        self.io_curve(&audiogram, range, &fitting, Vec::new())
    }

    fn tcc_io_curve(
        &mut self,
        audiogram: Audiogram<'_>,
        range: CurveRange,
        fitting: Fitting,
        coupling: Coupling,
    ) -> Result<IoCurve> {
        self.io_curve(&audiogram, range, &fitting, vec![coupling.target])
    }

    fn ear_simulator_io_curve(
        &mut self,
        audiogram: Audiogram<'_>,
        range: CurveRange,
        fitting: Fitting,
        coupling: Coupling,
    ) -> Result<IoCurve> {
        let mut curve = self.io_curve(&audiogram, range, &fitting, vec![coupling.target])?;
        for v in curve.io.iter_mut().chain(curve.io_unlimited.iter_mut()) {
            *v = round1(*v + 3.0);
        }
        Ok(curve)
    }

    fn speech_o_gram(&mut self, audiogram: Audiogram<'_>, level: f64, fitting: Fitting) -> Result<SpeechOGram> {
        let gain = self.insertion_gain(&audiogram, level, &fitting);
        let rms: Vec<f64> = gain.iter().map(|g| round1(level - 20.0 + g)).collect();
        Ok(SpeechOGram {
            max: rms.iter().map(|v| round1(v + 12.0)).collect(),
            min: rms.iter().map(|v| round1(v - 18.0)).collect(),
            thresh: audiogram.ac.to_vec(),
            rms,
        })
    }

    fn aided_threshold(
        &mut self,
        audiogram: Audiogram<'_>,
        ct: &[f64],
        db_option: i32,
        fitting: Fitting,
    ) -> Result<Vec<f64>> {
        let gain = self.insertion_gain(&audiogram, REFERENCE_LEVEL, &fitting);
        let floor = ct.iter().copied().fold(f64::INFINITY, f64::min);
        let floor = if floor.is_finite() { floor - 40.0 } else { 0.0 };
        let spl = if db_option == 0 { 0.0 } else { 5.0 };
        Ok(audiogram
            .ac
            .iter()
            .zip(gain)
            .map(|(ac, g)| round1((ac - g + spl).max(floor)))
            .collect())
    }

    fn redd(&mut self, def_values: i32, bands: Bands) -> Result<Vec<f64>> {
        match &self.redd {
            Some(stored) if def_values == 0 && stored.len() == bands.count() => Ok(stored.clone()),
            _ => Ok(tilt(bands, 2.0, 1.5)),
        }
    }

    fn set_redd(&mut self, redd: &[f64], _def_values: i32, bands: Bands) -> Result<()> {
        check_bands("REDD", redd, bands)?;
        self.redd = Some(redd.to_vec());
        Ok(())
    }

    fn reur(&mut self, def_values: i32, date_of_birth: i32, direction: i32, _mic: i32, bands: Bands) -> Result<Vec<f64>> {
        match &self.reur {
            Some(stored) if def_values == 0 && stored.len() == bands.count() => Ok(stored.clone()),
            _ => {
                let born = if date_of_birth > 0 { date_of_birth } else { self.profile.date_of_birth };
                let child = if born > 0 && self.profile.adult_child != 0 { 2.0 } else { 0.0 };
                Ok(tilt(bands, 8.0 + child + f64::from(direction), 2.0))
            }
        }
    }

    fn set_reur(
        &mut self,
        reur: &[f64],
        _def_values: i32,
        _date_of_birth: i32,
        _direction: i32,
        _mic: i32,
        bands: Bands,
    ) -> Result<()> {
        check_bands("REUR", reur, bands)?;
        self.reur = Some(reur.to_vec());
        Ok(())
    }

    fn recdh(&mut self, query: RecdQuery, bands: Bands) -> Result<Vec<f64>> {
        match &self.recdh {
            Some(stored) if stored.len() == bands.count() => Ok(stored.clone()),
            _ => Ok(tilt(bands, 4.0 + f64::from(query.coupler), 3.0)),
        }
    }

    fn set_recdh(&mut self, recdh: &[f64], bands: Bands) -> Result<()> {
        check_bands("RECDh", recdh, bands)?;
        self.recdh = Some(recdh.to_vec());
        Ok(())
    }

    fn recdt(&mut self, query: RecdQuery, bands: Bands) -> Result<Vec<f64>> {
        match &self.recdt {
            Some(stored) if stored.len() == bands.count() => Ok(stored.clone()),
            _ => Ok(tilt(bands, 4.0 + f64::from(query.coupler) - f64::from(query.vent), 3.0)),
        }
    }

    fn set_recdt(&mut self, recdt: &[f64], bands: Bands) -> Result<()> {
        check_bands("RECDt", recdt, bands)?;
        self.recdt = Some(recdt.to_vec());
        Ok(())
    }

    fn apply_setting(&mut self, setting: ClientSetting) -> Result<()> {
        match setting {
            ClientSetting::AdultChild {
                adult_child,
                date_of_birth,
            } => {
                self.profile.adult_child = adult_child;
                self.profile.date_of_birth = date_of_birth;
            }
            ClientSetting::Experience(v) => self.profile.experience = v,
            ClientSetting::CompSpeed(v) => self.profile.comp_speed = v,
            ClientSetting::TonalLanguage(v) => self.profile.tonal = v,
            ClientSetting::Gender(v) => self.profile.gender = v,
        }
        Ok(())
    }

    fn gain_at(&mut self, query: GainAtQuery<'_>) -> Result<f64> {
        let gain = self.insertion_gain(&query.audiogram, query.level, &query.fitting);
        if gain.is_empty() {
            return Err(CallError::Engine("empty audiogram".to_string()));
        }
        // nearest audiometric frequency
        let target = f64::from(query.freq_required);
        let index = BANDS_9
            .iter()
            .take(gain.len())
            .enumerate()
            .min_by(|a, b| (a.1 - target).abs().total_cmp(&(b.1 - target).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0);
        Ok(gain[index])
    }

    fn mle(&mut self, aid_type: i32, direction: i32, mic: i32) -> Result<Vec<f64>> {
        Ok(tilt(Bands::Nineteen, (f64::from(aid_type) + f64::from(mic)) * 0.5, f64::from(direction)))
    }

    fn return_values(&mut self) -> Result<ReturnValues> {
        Ok(ReturnValues {
            maf: tilt(Bands::Nineteen, 4.0, -2.0),
            bwc: if self.bwc.is_empty() {
                vec![0.0; BANDS_19.len()]
            } else {
                self.bwc.clone()
            },
            escd: tilt(Bands::Nineteen, 1.0, 1.0),
        })
    }

    fn tubing(&mut self, tubing: i32, bands: Bands) -> Result<Vec<f64>> {
        Ok(tilt(bands, -f64::from(tubing), 1.0))
    }

    fn vent_out(&mut self, vent: i32, bands: Bands) -> Result<Vec<f64>> {
        Ok(tilt(bands, -f64::from(vent) * 2.0, 3.0))
    }

    fn speech_intelligibility(&mut self, s: i32, reag: &[f64], limit: &[f64]) -> Result<f64> {
        let audible = reag
            .iter()
            .zip(limit)
            .filter(|(gain, limit)| **gain + f64::from(s) > **limit)
            .count();
        Ok(ratio(audible, reag.len()))
    }

    fn speech_intelligibility_index(&mut self, query: SiiQuery<'_>) -> Result<f64> {
        let audible = query
            .reag
            .iter()
            .zip(query.speech_thresh)
            .filter(|(gain, thresh)| **gain + f64::from(query.s) > **thresh)
            .count();
        Ok(ratio(audible, query.reag.len()))
    }
}

impl ReferenceEngine {
    fn io_curve(
        &self,
        audiogram: &Audiogram<'_>,
        range: CurveRange,
        fitting: &Fitting,
        line_type: Vec<i32>,
    ) -> Result<IoCurve> {
        if range.finish_level < range.start_level {
            return Err(CallError::Engine(format!(
                "finish level {} below start level {}",
                range.finish_level, range.start_level
            )));
        }
        let ceiling = if fitting.limiting == 0 { f64::INFINITY } else { 115.0 };
        let mut io = Vec::new();
        let mut io_unlimited = Vec::new();
        for level in (range.start_level..=range.finish_level).step_by(5) {
            let level = f64::from(level);
            let gain = self.insertion_gain(audiogram, level, fitting);
            let mean = if gain.is_empty() {
                0.0
            } else {
                gain.iter().sum::<f64>() / gain.len() as f64
            };
            io_unlimited.push(round1(level + mean));
            io.push(round1((level + mean).min(ceiling)));
        }
        Ok(IoCurve {
            io,
            io_unlimited,
            line_type,
        })
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 1000.0).round() / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audiogram<'a>(ac: &'a [f64], bc: &'a [f64]) -> Audiogram<'a> {
        Audiogram { ac, bc, ac_other: &[] }
    }

    #[test]
    fn test_crossover_and_centre_frequencies() {
        let mut engine = ReferenceEngine::new();
        let result = engine.cross_over_frequencies(4, &[], &[]).unwrap();
        assert_eq!(result.cf_array.len(), 3);
        assert_eq!(result.freq_in_ch.len(), 19);
        assert!(result.freq_in_ch.windows(2).all(|w| w[0] <= w[1]));

        let centres = engine.center_frequencies(4, &result.cf_array).unwrap();
        assert_eq!(centres.len(), 4);
        assert!(engine.cross_over_frequencies(0, &[], &[]).is_err());
    }

    #[test]
    fn test_transforms_are_stateful() {
        let mut engine = ReferenceEngine::new();
        let custom = vec![1.0; 9];
        engine.set_redd(&custom, 0, Bands::Nine).unwrap();
        assert_eq!(engine.redd(0, Bands::Nine).unwrap(), custom);
        assert_eq!(engine.redd(0, Bands::Nineteen).unwrap().len(), 19);
        assert!(engine.set_redd(&custom, 0, Bands::Nineteen).is_err());
    }

    #[test]
    fn test_gain_grows_with_loss() {
        let mut engine = ReferenceEngine::new();
        let fitting = Fitting::default();
        let mild = engine
            .real_ear_insertion_gain(audiogram(&[20.0, 30.0], &[20.0, 30.0]), 65.0, fitting)
            .unwrap();
        let severe = engine
            .real_ear_insertion_gain(audiogram(&[70.0, 80.0], &[70.0, 80.0]), 65.0, fitting)
            .unwrap();
        assert!(mild.iter().zip(&severe).all(|(m, s)| m < s));
    }

    #[test]
    fn test_extreme_codes_do_not_overflow() {
        let mut engine = ReferenceEngine::new();
        let mle = engine.mle(i32::MAX, 0, i32::MAX).unwrap();
        assert_eq!(mle.len(), 19);
        assert!(mle.iter().all(|v| v.is_finite()));

        let coupling = Coupling {
            target: 1,
            aid_type: 0,
            tubing: i32::MAX,
            vent: i32::MAX,
            recd_meas_type: 0,
        };
        let result = engine
            .tcc_coupler_gain(audiogram(&[40.0], &[40.0]), 65.0, Fitting::default(), coupling)
            .unwrap();
        assert_eq!(result.line_type, vec![1; result.gain.len()]);
        assert!(result.gain.iter().all(|g| g.is_finite()));
    }

    #[test]
    fn test_version_override() {
        let mut engine = ReferenceEngine::new().with_version(2, 5);
        assert_eq!(engine.dll_version().unwrap(), (2, 5));
    }
}
