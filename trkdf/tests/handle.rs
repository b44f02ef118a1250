use rusqlite::{params, Connection};
use trkcore::algorithm::config::AssociatorConfig;
use trkcore::data::cluster::{Pixel, PixelCluster, StripCluster};
use trkcore::data::det_id::{DetId, SubDetector};
use trkcore::data::event::InMemoryEvent;
use trkcore::data::rec_hit::{RecHitKind, TrackerRecHit};
use trkcore::data::sim_hit::{LocalPoint, SimHit};
use trkcore::simulation::digi_sim_link::{PixelDigiSimLink, StripDigiSimLink};
use trkcore::TrackerHitAssociator;
use trkdf::association::{
    associate_event, associate_events, distinct_event_ids, write_associations_json, HitAssociation,
};
use trkdf::data::containers::{PixelClusterRow, RecHitRow, StripClusterRow};
use trkdf::data::handle::TrackerEventDataHandle;
use trkdf::error::TrkDfError;

fn strip_det() -> DetId {
    DetId::tracker(SubDetector::Tob, 64)
}

fn pixel_det() -> DetId {
    DetId::tracker(SubDetector::PixelBarrel, 8)
}

fn empty_store() -> TrackerEventDataHandle {
    let handle = TrackerEventDataHandle::from_connection(Connection::open_in_memory().unwrap());
    handle.create_schema().unwrap();
    handle
}

fn sample_event(event_id: u32) -> InMemoryEvent {
    let glued = strip_det();
    let mono = glued.mono_partition();
    let stereo = glued.stereo_partition();
    InMemoryEvent::new(event_id)
        .with_sim_hits(
            "TrackerHitsTOBLowTof",
            vec![
                SimHit::new(mono, 1, LocalPoint::new(0.5, 1.0, 0.0)).with_particle_type(13),
                SimHit::new(stereo, 1, LocalPoint::new(0.6, 1.1, 0.0)).with_particle_type(13),
                SimHit::new(mono, 2, LocalPoint::new(-0.5, 0.0, 0.0)).with_particle_type(11),
            ],
        )
        .with_sim_hits(
            "TrackerHitsPixelBarrelLowTof",
            vec![SimHit::new(pixel_det(), 3, LocalPoint::new(0.01, 0.02, 0.0))],
        )
        .with_strip_links(
            "siStripDigis",
            vec![
                (mono, StripDigiSimLink::new(100, 1, 1.0)),
                (mono, StripDigiSimLink::new(101, 1, 0.7)),
                (mono, StripDigiSimLink::new(101, 2, 0.3)),
                (stereo, StripDigiSimLink::new(200, 1, 1.0)),
            ]
            .into_iter()
            .collect(),
        )
        .with_pixel_links(
            "siPixelDigis",
            vec![(pixel_det(), PixelDigiSimLink::at_pixel(30, 40, 3, 1.0))].into_iter().collect(),
        )
}

fn populated_store() -> TrackerEventDataHandle {
    let handle = empty_store();
    let event = sample_event(7);
    handle.store_event(&event).unwrap();

    let glued = strip_det();
    handle
        .insert_strip_cluster(7, &StripClusterRow {
            cluster_id: 1,
            det_id: glued.mono_partition(),
            cluster: StripCluster::new(100, vec![60, 40]),
        })
        .unwrap();
    handle
        .insert_strip_cluster(7, &StripClusterRow {
            cluster_id: 2,
            det_id: glued.stereo_partition(),
            cluster: StripCluster::new(200, vec![80]),
        })
        .unwrap();
    handle
        .insert_pixel_cluster(7, &PixelClusterRow {
            cluster_id: 3,
            det_id: pixel_det(),
            cluster: PixelCluster::new(vec![Pixel { row: 30, col: 40, adc: 90 }, Pixel { row: 31, col: 40, adc: 10 }]),
        })
        .unwrap();

    handle.insert_rec_hit(7, &RecHitRow::simple_strip(10, glued.mono_partition(), 1)).unwrap();
    handle.insert_rec_hit(7, &RecHitRow::simple_strip(11, glued.stereo_partition(), 2)).unwrap();
    handle.insert_rec_hit(7, &RecHitRow::matched_strip(12, glued, 10, 11)).unwrap();
    handle.insert_rec_hit(7, &RecHitRow::pixel(13, pixel_det(), 3)).unwrap();
    handle.insert_rec_hit(7, &RecHitRow::other(14, pixel_det())).unwrap();
    // dangling cluster reference
    handle.insert_rec_hit(7, &RecHitRow::pixel(15, pixel_det(), 99)).unwrap();
    handle
}

#[test]
fn stored_event_loads_back_in_order() {
    let handle = empty_store();
    let event = sample_event(3);
    handle.store_event(&event).unwrap();

    let loaded = handle.load_event(3).unwrap();
    assert_eq!(loaded.event_id, 3);
    assert_eq!(loaded.sim_hits, event.sim_hits);
    assert_eq!(loaded.strip_links, event.strip_links);
    assert_eq!(loaded.pixel_links, event.pixel_links);

    assert!(handle.load_event(4).unwrap().sim_hits.is_empty());
}

#[test]
fn event_ids_are_distinct_and_sorted() {
    let handle = empty_store();
    handle.store_event(&sample_event(9)).unwrap();
    handle.store_event(&sample_event(2)).unwrap();
    handle.insert_rec_hit(5, &RecHitRow::other(1, pixel_det())).unwrap();
    assert_eq!(handle.read_event_ids().unwrap(), vec![2, 5, 9]);
}

#[test]
fn rec_hits_resolve_clusters_and_skip_dangling_rows() {
    let handle = populated_store();
    let hits = handle.read_rec_hits(7).unwrap();

    let ids: Vec<i64> = hits.iter().map(|h| h.hit_id).collect();
    assert_eq!(ids, vec![10, 11, 12, 13, 14]);

    let kinds: Vec<RecHitKind> = hits.iter().map(|h| h.hit.kind()).collect();
    assert_eq!(
        kinds,
        vec![RecHitKind::SimpleStrip, RecHitKind::SimpleStrip, RecHitKind::MatchedStrip, RecHitKind::Pixel, RecHitKind::Other]
    );

    match &hits[2].hit {
        TrackerRecHit::MatchedStrip(matched) => {
            assert_eq!(matched.det_id, strip_det());
            assert_eq!(matched.mono.cluster.first_strip, 100);
            assert_eq!(matched.stereo.cluster.first_strip, 200);
        }
        other => panic!("expected a matched hit, got {:?}", other),
    }
}

#[test]
fn broken_json_column_is_a_conversion_error() {
    let handle = empty_store();
    handle
        .connection
        .execute(
            "INSERT INTO strip_clusters (event_id, cluster_id, det_id, first_strip, amplitudes) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![1, 1, strip_det().raw(), 0, "[1, 2"],
        )
        .unwrap();
    assert!(matches!(
        handle.read_strip_clusters(1),
        Err(rusqlite::Error::FromSqlConversionFailure(3, _, _))
    ));
}

fn find_hit(associations: &[HitAssociation], hit_id: i64) -> &HitAssociation {
    associations.iter().find(|a| a.hit_id == hit_id).unwrap()
}

#[test]
fn event_association_matches_direct_association() {
    let handle = populated_store();
    let config = AssociatorConfig::default();
    let associations = associate_event(&handle, 7, &config).unwrap();

    let by_hit = |hit_id: i64| find_hit(&associations, hit_id);

    // mono: track 1 holds 60 + 28 of 100
    assert_eq!(by_hit(10).track_ids, vec![1]);
    assert!((by_hit(10).charge_fractions[0].unwrap() - 0.88).abs() < 1e-5);
    assert_eq!(by_hit(10).sim_hit_count, 1);
    assert_eq!(by_hit(11).track_ids, vec![1]);
    // glued module: sim hits of track 1 from both partitions
    assert_eq!(by_hit(12).track_ids, vec![1]);
    assert_eq!(by_hit(12).sim_hit_count, 2);
    assert_eq!(by_hit(12).sub_detector.as_deref(), Some("TOB"));
    assert_eq!(by_hit(13).track_ids, vec![3]);
    assert_eq!(by_hit(13).charge_fractions, vec![None]);
    assert!(by_hit(14).track_ids.is_empty());

    let event = handle.load_event(7).unwrap();
    let associator = TrackerHitAssociator::with_config(&event, config).unwrap();
    for stored in handle.read_rec_hits(7).unwrap() {
        assert_eq!(by_hit(stored.hit_id).track_ids, associator.associate_hit_id(&stored.hit));
    }
}

#[test]
fn multi_event_results_follow_requested_order() {
    let handle = populated_store();
    handle.store_event(&sample_event(8)).unwrap();
    handle.insert_rec_hit(8, &RecHitRow::other(1, strip_det())).unwrap();

    let associations = associate_events(&handle, &[8, 7], &AssociatorConfig::default()).unwrap();
    assert_eq!(associations.len(), 6);
    assert_eq!(associations[0].event_id, 8);
    assert!(associations[1..].iter().all(|a| a.event_id == 7));
}

#[test]
fn repeated_event_ids_are_associated_once() {
    assert_eq!(distinct_event_ids(&[7, 3, 7, 3, 9]), vec![7, 3, 9]);

    let handle = populated_store();
    let associations = associate_events(&handle, &[7, 7], &AssociatorConfig::default()).unwrap();
    assert_eq!(associations.len(), 5);
    assert_eq!(handle.write_associations(7, &associations).unwrap(), 4);
    assert_eq!(handle.read_associations(7).unwrap().len(), 4);
}

#[test]
fn invalid_config_is_rejected_before_loading() {
    let handle = populated_store();
    let config = AssociatorConfig { charge_fraction_cut: 2.0, ..AssociatorConfig::default() };
    assert!(matches!(associate_event(&handle, 7, &config), Err(TrkDfError::Core(_))));
}

#[test]
fn associations_round_trip_through_store_and_json() {
    let handle = populated_store();
    let associations = associate_event(&handle, 7, &AssociatorConfig::default()).unwrap();

    let written = handle.write_associations(7, &associations).unwrap();
    assert_eq!(written, 4);
    // rewriting replaces the previous rows
    assert_eq!(handle.write_associations(7, &associations).unwrap(), 4);
    assert_eq!(handle.read_associations(7).unwrap(), vec![(10, 1), (11, 1), (12, 1), (13, 3)]);

    let mut buffer = Vec::new();
    write_associations_json(&mut buffer, &associations).unwrap();
    let parsed: Vec<HitAssociation> = serde_json::from_slice(&buffer).unwrap();
    assert_eq!(parsed, associations);
}
