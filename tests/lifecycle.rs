use dfg_engine::filter::StreamFilter;
use dfg_engine::persist::{load_gaskets, load_streams, save_streams};
use dfg_engine::{recompute_streams, DfgModel, ModelAction, ModelError, StreamDraft, StreamId, StreamPatch};

const GASKETS: &str = r#"[
    {"Name": "ADC", "InputBufferSize": 0, "OutputBufferSize": 512,
     "OutputStreams": [{"Index": 4}, {"Index": 5}, {"Index": 6}],
     "MinOutputStreamBufferSize": 32},
    {"Name": "DSP", "InputBufferSize": 512, "OutputBufferSize": 512,
     "InputStreams": [{"Index": 0}, {"Index": 1}, {"Index": 2}],
     "OutputStreams": [{"Index": 16}, {"Index": 17}],
     "MinInputStreamBufferSize": 32, "MinOutputStreamBufferSize": 32},
    {"Name": "DAC", "InputBufferSize": 256, "OutputBufferSize": 0,
     "InputStreams": [{"Index": 0, "BufferSize": 64}, {"Index": 1, "BufferSize": 128}]}
]"#;

fn model() -> DfgModel {
    DfgModel::new(load_gaskets(GASKETS).unwrap())
}

#[test]
fn recompute_is_idempotent() {
    let mut model = model();
    model
        .create(StreamDraft::new("ADC", 64).destination("DSP", 64).group("audio"))
        .unwrap();
    model
        .create(StreamDraft::new("ADC", 256).destination("DSP", 128).destination("DAC", 128))
        .unwrap();
    model.create(StreamDraft::new("DSP", 64).destination("DAC", 64)).unwrap();

    let once = model.streams().to_vec();
    let report = model.report().clone();
    let again = recompute_streams(model.gaskets(), model.catalog(), once.clone());
    assert_eq!(again.streams, once);
    assert_eq!(again.report, report);
    assert_eq!(&again.plan, model.plan());
}

#[test]
fn saved_model_reloads_identically() {
    let mut model = model();
    model
        .create(
            StreamDraft::new("ADC", 128)
                .destination("DSP", 128)
                .description("mic")
                .source_config("SampleRate", serde_json::json!(48_000)),
        )
        .unwrap();
    model.create(StreamDraft::new("DSP", 64).destination("DAC", 64)).unwrap();

    let json = save_streams(model.streams()).unwrap();
    assert!(json.contains("\"SampleRate\": 48000"));
    let reloaded = DfgModel::load(load_gaskets(GASKETS).unwrap(), load_streams(&json).unwrap());
    assert_eq!(reloaded.streams(), model.streams());
    assert_eq!(reloaded.report(), model.report());
    assert_eq!(reloaded.streams()[0].source.config["SampleRate"], 48_000);
}

#[test]
fn update_repacks_and_revalidates() {
    let mut model = model();
    let small = model.create(StreamDraft::new("ADC", 32).destination("DSP", 32)).unwrap();
    let large = model.create(StreamDraft::new("ADC", 64).destination("DSP", 64)).unwrap();
    assert_eq!(model.stream(small).unwrap().source.buffer_address, 64);

    let mut source = model.stream(small).unwrap().source.clone();
    source.buffer_size = 1024;
    model
        .update(small, &StreamPatch { source: Some(source), ..StreamPatch::default() })
        .unwrap();

    assert_eq!(model.stream(small).unwrap().source.buffer_address, 0);
    assert_eq!(model.stream(large).unwrap().source.buffer_address, 1024);
    assert!(!model.report().for_stream(small).is_empty());
    assert!(!model.report().for_gasket("ADC").is_empty());
}

#[test]
fn editing_reference_tracks_lifecycle() {
    let mut model = model();
    let id = model
        .dispatch(ModelAction::Create(StreamDraft::new("ADC", 64).destination("DAC", 64)))
        .unwrap()
        .unwrap();
    assert_eq!(id, StreamId(4));

    model.dispatch(ModelAction::BeginEdit { id }).unwrap();
    assert_eq!(model.editing().map(|s| s.stream_id), Some(id));

    model
        .dispatch(ModelAction::Update {
            id,
            patch: StreamPatch { group: Some("out".into()), ..StreamPatch::default() },
        })
        .unwrap();
    assert_eq!(model.editing().unwrap().group, "out");

    model.dispatch(ModelAction::Remove { id }).unwrap();
    assert!(model.editing().is_none());
    assert_eq!(
        model.dispatch(ModelAction::BeginEdit { id }),
        Err(ModelError::StreamNotFound(id))
    );
}

#[test]
fn create_fails_once_source_channels_are_used() {
    let mut model = model();
    for _ in 0..2 {
        model.create(StreamDraft::new("DSP", 32).destination("DAC", 64)).unwrap();
    }
    let draft = StreamDraft::new("DSP", 32).destination("DAC", 64);
    assert_eq!(
        model.next_stream_id(&draft),
        Err(ModelError::NoAvailableChannel { gasket: "DSP".into(), used: 2 })
    );
    assert!(model.create(draft).is_err());
    assert_eq!(model.outbound("DSP").len(), 2);
}

#[test]
fn filters_select_streams_of_a_loaded_model() {
    let mut model = model();
    model
        .create(StreamDraft::new("ADC", 64).destination("DSP", 64).description("Left mic"))
        .unwrap();
    model
        .create(StreamDraft::new("ADC", 64).destination("DAC", 64).description("Right mic"))
        .unwrap();

    let filter = StreamFilter {
        destinations: vec!["DAC".into()],
        ..StreamFilter::default()
    };
    let hits = filter.apply(model.streams());
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].description, "Right mic");
    assert_eq!(StreamFilter::search("mic").apply(model.streams()).len(), 2);
}
