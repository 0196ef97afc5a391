//! Function catalog: name-indexed descriptors for every remote call.
//!
//! Each [`FunctionDescriptor`] pairs an ordered argument schema with an
//! invoker that adapts [`Args`] to one typed [`NalEngine`] operation and
//! collects the typed result into [`Outputs`]. The catalog is built once
//! and never mutated afterwards; adding a function means adding an entry
//! to [`FunctionCatalog::standard`].

use std::collections::HashMap;

use crate::derived::{DerivedSlot, SlotValue};
use crate::engine::{
    Audiogram, Bands, ClientSetting, CompressionThresholdQuery, Coupling, CurveRange, Fitting,
    GainAtQuery, NalEngine, RecdQuery, SiiQuery,
};
use crate::params::{ArgValue, Args, Outputs, ParamSpec as P};
use crate::{CallError, Result};

/// Adapter from schema-checked arguments to one engine operation.
pub type Invoker = fn(&mut dyn NalEngine, &Args) -> Result<Outputs>;

/// Immutable description of one catalog function.
pub struct FunctionDescriptor {
    name: &'static str,
    schema: Vec<P>,
    derived_outputs: Vec<(&'static str, DerivedSlot)>,
    invoker: Invoker,
}

impl FunctionDescriptor {
    pub fn new(name: &'static str, invoker: Invoker) -> Self {
        Self {
            name,
            schema: Vec::new(),
            derived_outputs: Vec::new(),
            invoker,
        }
    }

    pub fn params(mut self, specs: impl IntoIterator<Item = P>) -> Self {
        self.schema.extend(specs);
        self
    }

    /// Record output `key` into `slot` after every successful call.
    pub fn derives(mut self, key: &'static str, slot: DerivedSlot) -> Self {
        self.derived_outputs.push((key, slot));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn schema(&self) -> &[P] {
        &self.schema
    }

    pub fn derived_outputs(&self) -> &[(&'static str, DerivedSlot)] {
        &self.derived_outputs
    }

    pub fn invoke(&self, engine: &mut dyn NalEngine, args: &Args) -> Result<Outputs> {
        (self.invoker)(engine, args)
    }

    /// Derived-slot values carried by `outputs`.
    pub fn derived_values(&self, outputs: &Outputs) -> Vec<(DerivedSlot, SlotValue)> {
        self.derived_outputs
            .iter()
            .filter_map(|(key, slot)| {
                outputs
                    .get(key)
                    .and_then(|value| value.as_slot_value())
                    .map(|value| (*slot, value))
            })
            .collect()
    }
}

impl std::fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("derived_outputs", &self.derived_outputs)
            .finish()
    }
}

/// Registry of all callable functions, keyed by name.
#[derive(Debug, Default)]
pub struct FunctionCatalog {
    functions: HashMap<&'static str, FunctionDescriptor>,
}

impl FunctionCatalog {
    pub fn new(descriptors: impl IntoIterator<Item = FunctionDescriptor>) -> Self {
        let mut functions = HashMap::new();
        for descriptor in descriptors {
            let name = descriptor.name;
            let previous = functions.insert(name, descriptor);
            debug_assert!(previous.is_none(), "duplicate catalog entry: {}", name);
        }
        Self { functions }
    }

    pub fn resolve(&self, name: &str) -> Result<&FunctionDescriptor> {
        self.functions
            .get(name)
            .ok_or_else(|| CallError::UnknownFunction(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names in lexical order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// The full NAL-NL2 function set.
    pub fn standard() -> Self {
        Self::new([
            FunctionDescriptor::new("dllVersion", |engine, _| {
                let (major, minor) = engine.dll_version()?;
                Ok(Outputs::new().int("major", major.into()).int("minor", minor.into()))
            }),
            // Gains
            FunctionDescriptor::new("RealEarInsertionGain_NL2", |engine, args| {
                let reig = engine.real_ear_insertion_gain(audiogram(args)?, args.float("L")?, fitting(args)?)?;
                Ok(Outputs::new().floats("REIG", reig))
            })
            .params(gain_schema()),
            FunctionDescriptor::new("RealEarAidedGain_NL2", |engine, args| {
                let reag = engine.real_ear_aided_gain(monaural(args)?, args.float("L")?, fitting(args)?)?;
                Ok(Outputs::new().floats("REAG", reag))
            })
            .params([
                P::floats("AC"),
                P::floats("BC"),
                P::float("L"),
                P::int("limiting"),
                P::int("channels"),
                P::int("direction"),
                P::int("mic"),
                P::int("noOfAids"),
            ]),
            FunctionDescriptor::new("TccCouplerGain_NL2", |engine, args| {
                let result =
                    engine.tcc_coupler_gain(audiogram(args)?, args.float("L")?, fitting(args)?, coupling(args)?)?;
                Ok(Outputs::new()
                    .floats("TccGain", result.gain)
                    .ints("lineType", result.line_type))
            })
            .params(coupler_gain_schema(false)),
            FunctionDescriptor::new("EarSimulatorGain_NL2", |engine, args| {
                let result =
                    engine.ear_simulator_gain(audiogram(args)?, args.float("L")?, fitting(args)?, coupling(args)?)?;
                Ok(Outputs::new().floats("ESG", result.gain).ints("lineType", result.line_type))
            })
            .params(coupler_gain_schema(true)),
            // Channels and compression
            FunctionDescriptor::new("CrossOverFrequencies_NL2", |engine, args| {
                let result =
                    engine.cross_over_frequencies(args.int("channels")?, args.floats("AC")?, args.floats("BC")?)?;
                Ok(Outputs::new()
                    .floats("CFArray", result.cf_array)
                    .ints("FreqInCh", result.freq_in_ch))
            })
            .params([P::int("channels"), P::floats("AC"), P::floats("BC")])
            .derives("CFArray", DerivedSlot::CfArray)
            .derives("FreqInCh", DerivedSlot::FreqInCh),
            FunctionDescriptor::new("CenterFrequencies", |engine, args| {
                let centre = engine.center_frequencies(args.int("channels")?, args.floats("CFArray")?)?;
                Ok(Outputs::new().ints("centreF", centre))
            })
            .params([
                P::int("channels"),
                P::floats("CFArray")
                    .derived_from(DerivedSlot::CfArray)
                    .or_default(ArgValue::FloatSeq(Vec::new())),
            ]),
            FunctionDescriptor::new("setBWC", |engine, args| {
                engine.set_bwc(args.int("channels")?, args.floats("crossOver")?)?;
                Ok(Outputs::success())
            })
            .params([P::int("channels"), P::floats("crossOver")]),
            FunctionDescriptor::new("CompressionThreshold_NL2", |engine, args| {
                let ct = engine.compression_threshold(CompressionThresholdQuery {
                    band_width: args.int("bandWidth")?,
                    selection: args.int("selection")?,
                    wbct: args.int("WBCT")?,
                    aid_type: args.int("aidType")?,
                    direction: args.int("direction")?,
                    mic: args.int("mic")?,
                    calc_ch: args.ints("calcCh")?,
                })?;
                Ok(Outputs::new().floats("CT", ct))
            })
            .params([
                P::int("bandWidth").aliases(&["bandwidth"]).or_default(ArgValue::Int(0)),
                P::int("selection").or_default(ArgValue::Int(0)),
                P::int("WBCT").or_default(ArgValue::Int(0)),
                P::int("aidType").or_default(ArgValue::Int(0)),
                P::int("direction").or_default(ArgValue::Int(0)),
                P::int("mic").or_default(ArgValue::Int(0)),
                P::ints("calcCh"),
            ])
            .derives("CT", DerivedSlot::Ct),
            FunctionDescriptor::new("CompressionRatio_NL2", |engine, args| {
                let cr = engine.compression_ratio(args.ints("centreFreq")?, audiogram(args)?, fitting(args)?)?;
                Ok(Outputs::new().floats("CR", cr))
            })
            .params([
                P::int("channels"),
                P::ints("centreFreq"),
                P::floats("AC"),
                P::floats("BC"),
                P::int("direction"),
                P::int("mic"),
                P::int("limiting"),
                P::floats("ACother"),
                P::int("noOfAids"),
            ]),
            FunctionDescriptor::new("getMPO_NL2", |engine, args| {
                let mpo = engine.mpo(
                    args.int("type")?,
                    args.floats("AC")?,
                    args.floats("BC")?,
                    args.int("channels")?,
                    args.int("limiting")?,
                )?;
                Ok(Outputs::new().floats("MPO", mpo))
            })
            .params([
                P::int("type"),
                P::floats("AC"),
                P::floats("BC"),
                P::int("channels"),
                P::int("limiting"),
            ]),
            // Input/output curves
            FunctionDescriptor::new("RealEarInputOutputCurve_NL2", |engine, args| {
                let curve =
                    engine.real_ear_io_curve(audiogram(args)?, curve_range(args)?, fitting(args)?, args.int("target")?)?;
                Ok(Outputs::new().floats("REIO", curve.io).floats("REIOunl", curve.io_unlimited))
            })
            .params(io_curve_schema(false)),
            FunctionDescriptor::new("TccInputOutputCurve_NL2", |engine, args| {
                let curve = engine.tcc_io_curve(audiogram(args)?, curve_range(args)?, fitting(args)?, coupling(args)?)?;
                Ok(Outputs::new()
                    .floats("TccIO", curve.io)
                    .floats("TccIOunl", curve.io_unlimited)
                    .ints("lineType", curve.line_type))
            })
            .params(io_curve_schema(true)),
            FunctionDescriptor::new("EarSimulatorInputOutputCurve_NL2", |engine, args| {
                let curve =
                    engine.ear_simulator_io_curve(audiogram(args)?, curve_range(args)?, fitting(args)?, coupling(args)?)?;
                Ok(Outputs::new()
                    .floats("ESIO", curve.io)
                    .floats("ESIOunl", curve.io_unlimited)
                    .ints("lineType", curve.line_type))
            })
            .params(io_curve_schema(true)),
            // Speech and thresholds
            FunctionDescriptor::new("Speech_o_Gram_NL2", |engine, args| {
                let speech = engine.speech_o_gram(audiogram(args)?, args.float("L")?, fitting(args)?)?;
                Ok(Outputs::new()
                    .floats("Speech_rms", speech.rms)
                    .floats("Speech_max", speech.max)
                    .floats("Speech_min", speech.min)
                    .floats("Speech_thresh", speech.thresh))
            })
            .params(gain_schema()),
            FunctionDescriptor::new("AidedThreshold_NL2", |engine, args| {
                let at =
                    engine.aided_threshold(audiogram(args)?, args.floats("CT")?, args.int("dbOption")?, fitting(args)?)?;
                Ok(Outputs::new().floats("AT", at))
            })
            .params([
                P::floats("AC"),
                P::floats("BC"),
                P::floats("CT").derived_from(DerivedSlot::Ct),
                P::int("dbOption"),
                P::floats("ACother"),
                P::int("noOfAids"),
                P::int("limiting"),
                P::int("channels"),
                P::int("direction"),
                P::int("mic"),
            ]),
            // Individual transforms
            FunctionDescriptor::new("GetREDDindiv", get_redd::<false>).params([P::int("defValues")]),
            FunctionDescriptor::new("GetREDDindiv9", get_redd::<true>).params([P::int("defValues")]),
            FunctionDescriptor::new("GetREURindiv", get_reur::<false>).params(reur_schema(false)),
            FunctionDescriptor::new("GetREURindiv9", get_reur::<true>).params(reur_schema(false)),
            FunctionDescriptor::new("SetREDDindiv", set_redd::<false>)
                .params([P::floats("REDD"), P::int("defValues")]),
            FunctionDescriptor::new("SetREDDindiv9", set_redd::<true>)
                .params([P::floats("REDD"), P::int("defValues")]),
            FunctionDescriptor::new("SetREURindiv", set_reur::<false>).params(reur_schema(true)),
            FunctionDescriptor::new("SetREURindiv9", set_reur::<true>).params(reur_schema(true)),
            FunctionDescriptor::new("GetRECDh_indiv_NL2", get_recdh::<false>).params(recd_schema(false)),
            FunctionDescriptor::new("GetRECDh_indiv9_NL2", get_recdh::<true>).params(recd_schema(false)),
            FunctionDescriptor::new("GetRECDt_indiv_NL2", get_recdt::<false>).params(recd_schema(true)),
            FunctionDescriptor::new("GetRECDt_indiv9_NL2", get_recdt::<true>).params(recd_schema(true)),
            FunctionDescriptor::new("SetRECDh_indiv_NL2", set_recdh::<false>).params([P::floats("RECDh")]),
            FunctionDescriptor::new("SetRECDh_indiv9_NL2", set_recdh::<true>).params([P::floats("RECDh")]),
            FunctionDescriptor::new("SetRECDt_indiv_NL2", set_recdt::<false>).params([P::floats("RECDt")]),
            FunctionDescriptor::new("SetRECDt_indiv9_NL2", set_recdt::<true>).params([P::floats("RECDt")]),
            // Client profile
            FunctionDescriptor::new("SetAdultChild", |engine, args| {
                engine.apply_setting(ClientSetting::AdultChild {
                    adult_child: args.int("adultChild")?,
                    date_of_birth: args.int("dateOfBirth")?,
                })?;
                Ok(Outputs::success())
            })
            .params([P::int("adultChild"), P::int("dateOfBirth")]),
            FunctionDescriptor::new("SetExperience", |engine, args| {
                engine.apply_setting(ClientSetting::Experience(args.int("experience")?))?;
                Ok(Outputs::success())
            })
            .params([P::int("experience")]),
            FunctionDescriptor::new("SetCompSpeed", |engine, args| {
                engine.apply_setting(ClientSetting::CompSpeed(args.int("compSpeed")?))?;
                Ok(Outputs::success())
            })
            .params([P::int("compSpeed")]),
            FunctionDescriptor::new("SetTonalLanguage", |engine, args| {
                engine.apply_setting(ClientSetting::TonalLanguage(args.int("tonal")?))?;
                Ok(Outputs::success())
            })
            .params([P::int("tonal")]),
            FunctionDescriptor::new("SetGender", |engine, args| {
                engine.apply_setting(ClientSetting::Gender(args.int("gender")?))?;
                Ok(Outputs::success())
            })
            .params([P::int("gender")]),
            // Miscellaneous
            FunctionDescriptor::new("GainAt_NL2", |engine, args| {
                let gain = engine.gain_at(GainAtQuery {
                    freq_required: args.int("freqRequired")?,
                    target_type: args.int("targetType")?,
                    audiogram: audiogram(args)?,
                    level: args.float("L")?,
                    fitting: fitting(args)?,
                    band_width: args.int("bandWidth")?,
                    coupling: coupling(args)?,
                })?;
                Ok(Outputs::new().float("Gain", gain))
            })
            .params([
                P::int("freqRequired"),
                P::int("targetType"),
                P::floats("AC"),
                P::floats("BC"),
                P::float("L"),
                P::int("limiting"),
                P::int("channels"),
                P::int("direction"),
                P::int("mic"),
                P::floats("ACother"),
                P::int("noOfAids"),
                P::int("bandWidth"),
                P::int("target"),
                P::int("aidType"),
                P::int("tubing"),
                P::int("vent"),
                P::int("RECDmeasType"),
            ]),
            FunctionDescriptor::new("GetMLE", |engine, args| {
                let mle = engine.mle(args.int("aidType")?, args.int("direction")?, args.int("mic")?)?;
                Ok(Outputs::new().floats("MLE", mle))
            })
            .params([P::int("aidType"), P::int("direction"), P::int("mic")]),
            FunctionDescriptor::new("ReturnValues_NL2", |engine, _| {
                let values = engine.return_values()?;
                Ok(Outputs::new()
                    .floats("MAF", values.maf)
                    .floats("BWC", values.bwc)
                    .floats("ESCD", values.escd))
            }),
            FunctionDescriptor::new("GetTubing_NL2", get_tubing::<false>).params([P::int("tubing")]),
            FunctionDescriptor::new("GetTubing9_NL2", get_tubing::<true>).params([P::int("tubing")]),
            FunctionDescriptor::new("GetVentOut_NL2", get_vent_out::<false>).params([P::int("vent")]),
            FunctionDescriptor::new("GetVentOut9_NL2", get_vent_out::<true>).params([P::int("vent")]),
            FunctionDescriptor::new("Get_SI_NL2", |engine, args| {
                let si = engine.speech_intelligibility(args.int("s")?, args.floats("REAG")?, args.floats("Limit")?)?;
                Ok(Outputs::new().float("SI", si))
            })
            .params([P::int("s"), P::floats("REAG"), P::floats("Limit")]),
            FunctionDescriptor::new("Get_SII", |engine, args| {
                let sii = engine.speech_intelligibility_index(SiiQuery {
                    n_comp_speed: args.int("nCompSpeed")?,
                    speech_thresh: args.floats("Speech_thresh")?,
                    s: args.int("s")?,
                    reag: args.floats("REAG")?,
                    reag_plus: args.floats("REAGp")?,
                    reag_minus: args.floats("REAGm")?,
                    reur: args.floats("REUR")?,
                })?;
                Ok(Outputs::new().float("SII", sii))
            })
            .params([
                P::int("nCompSpeed"),
                P::floats("Speech_thresh"),
                P::int("s"),
                P::floats("REAG"),
                P::floats("REAGp"),
                P::floats("REAGm"),
                P::floats("REUR"),
            ]),
        ])
    }
}

fn bands<const NINE: bool>() -> Bands {
    if NINE { Bands::Nine } else { Bands::Nineteen }
}

fn audiogram(args: &Args) -> Result<Audiogram<'_>> {
    Ok(Audiogram {
        ac: args.floats("AC")?,
        bc: args.floats("BC")?,
        ac_other: args.floats("ACother")?,
    })
}

fn monaural(args: &Args) -> Result<Audiogram<'_>> {
    Ok(Audiogram {
        ac: args.floats("AC")?,
        bc: args.floats("BC")?,
        ac_other: &[],
    })
}

fn fitting(args: &Args) -> Result<Fitting> {
    Ok(Fitting {
        limiting: args.int("limiting")?,
        channels: args.int("channels")?,
        direction: args.int("direction")?,
        mic: args.int("mic")?,
        no_of_aids: args.int("noOfAids")?,
    })
}

fn coupling(args: &Args) -> Result<Coupling> {
    Ok(Coupling {
        target: args.int("target")?,
        aid_type: args.int("aidType")?,
        tubing: args.int("tubing")?,
        vent: args.int("vent")?,
        recd_meas_type: args.int("RECDmeasType")?,
    })
}

fn curve_range(args: &Args) -> Result<CurveRange> {
    Ok(CurveRange {
        graph_freq: args.int("graphFreq")?,
        start_level: args.int("startLevel")?,
        finish_level: args.int("finishLevel")?,
    })
}

fn recd_query(args: &Args, total: bool) -> Result<RecdQuery> {
    Ok(RecdQuery {
        recd_meas_type: args.int("RECDmeasType")?,
        date_of_birth: args.int("dateOfBirth")?,
        aid_type: args.int("aidType")?,
        tubing: args.int("tubing")?,
        vent: if total { args.int("vent")? } else { 0 },
        earpiece: if total { args.int("earpiece")? } else { 0 },
        coupler: args.int("coupler")?,
        fitting_depth: args.int("fittingDepth")?,
    })
}

fn gain_schema() -> Vec<P> {
    vec![
        P::floats("AC"),
        P::floats("BC"),
        P::float("L"),
        P::int("limiting"),
        P::int("channels"),
        P::int("direction"),
        P::int("mic"),
        P::floats("ACother"),
        P::int("noOfAids"),
    ]
}

/// The ear simulator variant takes direction/mic ahead of limiting/channels.
fn coupler_gain_schema(simulator: bool) -> Vec<P> {
    let mut schema = vec![P::floats("AC"), P::floats("BC"), P::float("L")];
    if simulator {
        schema.extend([P::int("direction"), P::int("mic"), P::int("limiting"), P::int("channels")]);
    } else {
        schema.extend([P::int("limiting"), P::int("channels"), P::int("direction"), P::int("mic")]);
    }
    schema.extend([
        P::int("target"),
        P::int("aidType"),
        P::floats("ACother"),
        P::int("noOfAids"),
        P::int("tubing"),
        P::int("vent"),
        P::int("RECDmeasType"),
    ]);
    schema
}

fn io_curve_schema(coupled: bool) -> Vec<P> {
    let mut schema = vec![
        P::floats("AC"),
        P::floats("BC"),
        P::int("graphFreq"),
        P::int("startLevel"),
        P::int("finishLevel"),
        P::int("limiting"),
        P::int("channels"),
        P::int("direction"),
        P::int("mic"),
        P::int("target"),
    ];
    if coupled {
        schema.push(P::int("aidType"));
    }
    schema.extend([P::floats("ACother"), P::int("noOfAids")]);
    if coupled {
        schema.extend([P::int("tubing"), P::int("vent"), P::int("RECDmeasType")]);
    }
    schema
}

fn reur_schema(with_values: bool) -> Vec<P> {
    let mut schema = Vec::new();
    if with_values {
        schema.push(P::floats("REUR"));
    }
    schema.extend([P::int("defValues"), P::int("dateOfBirth"), P::int("direction"), P::int("mic")]);
    schema
}

fn recd_schema(total: bool) -> Vec<P> {
    let mut schema = vec![
        P::int("RECDmeasType"),
        P::int("dateOfBirth"),
        P::int("aidType"),
        P::int("tubing"),
    ];
    if total {
        schema.extend([P::int("vent"), P::int("earpiece")]);
    }
    schema.extend([P::int("coupler"), P::int("fittingDepth")]);
    schema
}

fn get_redd<const NINE: bool>(engine: &mut dyn NalEngine, args: &Args) -> Result<Outputs> {
    let redd = engine.redd(args.int("defValues")?, bands::<NINE>())?;
    Ok(Outputs::new().floats("REDD", redd))
}

fn set_redd<const NINE: bool>(engine: &mut dyn NalEngine, args: &Args) -> Result<Outputs> {
    engine.set_redd(args.floats("REDD")?, args.int("defValues")?, bands::<NINE>())?;
    Ok(Outputs::success())
}

fn get_reur<const NINE: bool>(engine: &mut dyn NalEngine, args: &Args) -> Result<Outputs> {
    let reur = engine.reur(
        args.int("defValues")?,
        args.int("dateOfBirth")?,
        args.int("direction")?,
        args.int("mic")?,
        bands::<NINE>(),
    )?;
    Ok(Outputs::new().floats("REUR", reur))
}

fn set_reur<const NINE: bool>(engine: &mut dyn NalEngine, args: &Args) -> Result<Outputs> {
    engine.set_reur(
        args.floats("REUR")?,
        args.int("defValues")?,
        args.int("dateOfBirth")?,
        args.int("direction")?,
        args.int("mic")?,
        bands::<NINE>(),
    )?;
    Ok(Outputs::success())
}

fn get_recdh<const NINE: bool>(engine: &mut dyn NalEngine, args: &Args) -> Result<Outputs> {
    let recdh = engine.recdh(recd_query(args, false)?, bands::<NINE>())?;
    Ok(Outputs::new().floats("RECDh", recdh))
}

fn get_recdt<const NINE: bool>(engine: &mut dyn NalEngine, args: &Args) -> Result<Outputs> {
    let recdt = engine.recdt(recd_query(args, true)?, bands::<NINE>())?;
    Ok(Outputs::new().floats("RECDt", recdt))
}

fn set_recdh<const NINE: bool>(engine: &mut dyn NalEngine, args: &Args) -> Result<Outputs> {
    engine.set_recdh(args.floats("RECDh")?, bands::<NINE>())?;
    Ok(Outputs::success())
}

fn set_recdt<const NINE: bool>(engine: &mut dyn NalEngine, args: &Args) -> Result<Outputs> {
    engine.set_recdt(args.floats("RECDt")?, bands::<NINE>())?;
    Ok(Outputs::success())
}

fn get_tubing<const NINE: bool>(engine: &mut dyn NalEngine, args: &Args) -> Result<Outputs> {
    let tubing = engine.tubing(args.int("tubing")?, bands::<NINE>())?;
    Ok(Outputs::new().floats("Tubing", tubing))
}

fn get_vent_out<const NINE: bool>(engine: &mut dyn NalEngine, args: &Args) -> Result<Outputs> {
    let vent_out = engine.vent_out(args.int("vent")?, bands::<NINE>())?;
    Ok(Outputs::new().floats("VentOut", vent_out))
}
