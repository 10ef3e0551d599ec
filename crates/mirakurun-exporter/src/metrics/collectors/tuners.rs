use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use mirakurun_client::{MirakurunApi, Tuner};
use tracing::{error, warn};

use crate::metrics::{
    NAMESPACE,
    registry::{Collector, MetricChannel},
    types::{MetricDescriptor, MetricType},
};

const SUBSYSTEM: &str = "tuners";

/// Counts folded from one `/api/tuners` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunerSummary {
    pub free: i64,
    pub used: i64,
    pub fault: i64,
    pub remote: i64,
    pub gr: i64,
    pub bs: i64,
    pub cs: i64,
    pub sky: i64,
    pub total: i64,
    pub users: HashMap<String, i64>,
    pub drops: HashMap<String, i64>,
    pub packets: HashMap<String, i64>,
}

impl TunerSummary {
    pub fn from_tuners(tuners: &[Tuner]) -> Self {
        let mut summary = Self {
            total: tuners.len() as i64,
            ..Self::default()
        };

        for tuner in tuners {
            if tuner.is_free {
                summary.free += 1;
            }
            if tuner.is_using {
                summary.used += 1;
            }
            if tuner.is_fault {
                summary.fault += 1;
            }
            if tuner.is_remote {
                summary.remote += 1;
            }

            for channel_type in &tuner.types {
                match channel_type.as_str() {
                    "GR" => summary.gr += 1,
                    "BS" => summary.bs += 1,
                    "CS" => summary.cs += 1,
                    "SKY" => summary.sky += 1,
                    other => {
                        warn!(channel_type = other, tuner = %tuner.name, "unknown channel type")
                    }
                }
            }

            // Seeded before the user walk so idle devices still export zeros.
            let users = summary.users.entry(tuner.name.clone()).or_insert(0);
            let drops = summary.drops.entry(tuner.name.clone()).or_insert(0);
            let packets = summary.packets.entry(tuner.name.clone()).or_insert(0);

            for user in &tuner.users {
                *users += 1;

                let Some(stream_info) = &user.stream_info else {
                    continue;
                };
                for info in stream_info.values() {
                    *drops = drops.saturating_add(info.drop);
                    *packets = packets.saturating_add(info.packet);
                }
            }
        }

        summary
    }
}

/// Exports device availability and per-device stream statistics from
/// `/api/tuners`.
pub struct TunersCollector {
    client: Arc<dyn MirakurunApi>,

    available_tuner_devices: Arc<MetricDescriptor>,
    fault_tuner_devices: Arc<MetricDescriptor>,
    remote_tuner_devices: Arc<MetricDescriptor>,
    gr_tuner_devices: Arc<MetricDescriptor>,
    bs_tuner_devices: Arc<MetricDescriptor>,
    cs_tuner_devices: Arc<MetricDescriptor>,
    sky_tuner_devices: Arc<MetricDescriptor>,
    tuner_devices: Arc<MetricDescriptor>,
    users: Arc<MetricDescriptor>,
    stream_drops: Arc<MetricDescriptor>,
    stream_packets: Arc<MetricDescriptor>,
}

impl TunersCollector {
    pub fn new(client: Arc<dyn MirakurunApi>) -> Self {
        Self {
            client,
            available_tuner_devices: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "available_tuner_devices",
                "Number of available tuner devices in Mirakurun.",
                &["state"],
            ),
            fault_tuner_devices: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "fault_tuner_devices",
                "Number of fault tuner devices in Mirakurun.",
                &[],
            ),
            remote_tuner_devices: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "remote_tuner_devices",
                "Number of remote tuner devices in Mirakurun.",
                &[],
            ),
            gr_tuner_devices: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "GR_tuner_devices",
                "Number of GR tuner devices in Mirakurun.",
                &[],
            ),
            bs_tuner_devices: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "BS_tuner_devices",
                "Number of BS tuner devices in Mirakurun.",
                &[],
            ),
            cs_tuner_devices: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "CS_tuner_devices",
                "Number of CS tuner devices in Mirakurun.",
                &[],
            ),
            sky_tuner_devices: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "SKY_tuner_devices",
                "Number of SKY tuner devices in Mirakurun.",
                &[],
            ),
            tuner_devices: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "tuner_devices",
                "Number of all tuner devices in Mirakurun.",
                &[],
            ),
            users: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "users",
                "Number of tuner users in Mirakurun labeled by tuner device name.",
                &["tuner_device"],
            ),
            stream_drops: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "stream_drops_total",
                "Total number of drops in a TS stream of Mirakurun labeled by tuner device name.",
                &["tuner_device"],
            ),
            stream_packets: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "stream_packets_total",
                "Total number of packets in a TS stream of Mirakurun labeled by tuner device name.",
                &["tuner_device"],
            ),
        }
    }

    fn emit(&self, summary: &TunerSummary, ch: &mut MetricChannel) {
        ch.send(
            &self.available_tuner_devices,
            MetricType::Gauge,
            summary.free as f64,
            &["free"],
        );
        ch.send(
            &self.available_tuner_devices,
            MetricType::Gauge,
            summary.used as f64,
            &["used"],
        );

        for (descriptor, count) in [
            (&self.fault_tuner_devices, summary.fault),
            (&self.remote_tuner_devices, summary.remote),
            (&self.gr_tuner_devices, summary.gr),
            (&self.bs_tuner_devices, summary.bs),
            (&self.cs_tuner_devices, summary.cs),
            (&self.sky_tuner_devices, summary.sky),
            (&self.tuner_devices, summary.total),
        ] {
            ch.send(descriptor, MetricType::Gauge, count as f64, &[]);
        }

        for (tuner_device, count) in &summary.users {
            ch.send(&self.users, MetricType::Gauge, *count as f64, &[tuner_device.as_str()]);
        }
        for (tuner_device, count) in &summary.drops {
            ch.send(
                &self.stream_drops,
                MetricType::Counter,
                *count as f64,
                &[tuner_device.as_str()],
            );
        }
        for (tuner_device, count) in &summary.packets {
            ch.send(
                &self.stream_packets,
                MetricType::Counter,
                *count as f64,
                &[tuner_device.as_str()],
            );
        }
    }
}

#[async_trait]
impl Collector for TunersCollector {
    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![
            Arc::clone(&self.available_tuner_devices),
            Arc::clone(&self.fault_tuner_devices),
            Arc::clone(&self.remote_tuner_devices),
            Arc::clone(&self.gr_tuner_devices),
            Arc::clone(&self.bs_tuner_devices),
            Arc::clone(&self.cs_tuner_devices),
            Arc::clone(&self.sky_tuner_devices),
            Arc::clone(&self.tuner_devices),
            Arc::clone(&self.users),
            Arc::clone(&self.stream_drops),
            Arc::clone(&self.stream_packets),
        ]
    }

    async fn collect(&self, ch: &mut MetricChannel) {
        let tuners = match self.client.get_tuners().await {
            Ok(tuners) => tuners,
            Err(err) => {
                error!(error = %err, resource = "tuners", "failed to fetch Mirakurun tuners");
                return;
            }
        };

        self.emit(&TunerSummary::from_tuners(&tuners), ch);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{TunerSummary, TunersCollector};
    use crate::testing::{FakeApi, family, gather_from, tuner, user, user_with_stream};

    #[tokio::test]
    async fn two_device_scenario() {
        let api = Arc::new(FakeApi {
            tuners: Some(vec![
                tuner("A", &["GR"], true, false, vec![user_with_stream(&[(100, 2)])]),
                tuner("B", &["BS"], false, true, vec![]),
            ]),
            ..FakeApi::default()
        });

        let families = gather_from(TunersCollector::new(api)).await;

        let available = family(&families, "mirakurun_tuners_available_tuner_devices");
        assert_eq!(available.value_for(&["free"]), Some(1.0));
        assert_eq!(available.value_for(&["used"]), Some(1.0));
        assert_eq!(
            family(&families, "mirakurun_tuners_GR_tuner_devices").value_for(&[]),
            Some(1.0)
        );
        assert_eq!(
            family(&families, "mirakurun_tuners_BS_tuner_devices").value_for(&[]),
            Some(1.0)
        );
        assert_eq!(
            family(&families, "mirakurun_tuners_CS_tuner_devices").value_for(&[]),
            Some(0.0)
        );
        assert_eq!(
            family(&families, "mirakurun_tuners_tuner_devices").value_for(&[]),
            Some(2.0)
        );

        let users = family(&families, "mirakurun_tuners_users");
        assert_eq!(users.value_for(&["A"]), Some(1.0));
        assert_eq!(users.value_for(&["B"]), Some(0.0));

        let drops = family(&families, "mirakurun_tuners_stream_drops_total");
        assert_eq!(drops.value_for(&["A"]), Some(2.0));
        assert_eq!(drops.value_for(&["B"]), Some(0.0));

        let packets = family(&families, "mirakurun_tuners_stream_packets_total");
        assert_eq!(packets.value_for(&["A"]), Some(100.0));
        assert_eq!(packets.value_for(&["B"]), Some(0.0));
    }

    #[test]
    fn unknown_types_are_excluded_from_typed_counts() {
        let tuners = vec![
            tuner("A", &["GR", "BS"], true, false, vec![]),
            tuner("B", &["BS", "CS", "4K"], true, false, vec![]),
            tuner("C", &["SKY", "GR"], false, false, vec![]),
        ];
        let occurrences = tuners.iter().map(|tuner| tuner.types.len() as i64).sum::<i64>();

        let summary = TunerSummary::from_tuners(&tuners);

        assert_eq!((summary.gr, summary.bs, summary.cs, summary.sky), (2, 2, 1, 1));
        assert_eq!(
            summary.gr + summary.bs + summary.cs + summary.sky,
            occurrences - 1
        );
    }

    #[test]
    fn every_device_appears_in_each_grouping() {
        let tuners = vec![
            tuner(
                "PX-Q3PE-0",
                &["GR"],
                false,
                true,
                vec![
                    user_with_stream(&[(1000, 1), (500, 0)]),
                    user(),
                    user_with_stream(&[(10, 3)]),
                ],
            ),
            tuner("PX-Q3PE-1", &["GR"], true, false, vec![]),
            tuner("PX-Q3PE-2", &["BS", "CS"], true, false, vec![]),
        ];

        let summary = TunerSummary::from_tuners(&tuners);

        for grouping in [&summary.users, &summary.drops, &summary.packets] {
            assert_eq!(grouping.len(), 3);
            assert!(tuners.iter().all(|tuner| grouping.contains_key(&tuner.name)));
        }
        assert_eq!(summary.users["PX-Q3PE-0"], 3);
        assert_eq!(summary.drops["PX-Q3PE-0"], 4);
        assert_eq!(summary.packets["PX-Q3PE-0"], 1510);
        assert_eq!(summary.users["PX-Q3PE-2"], 0);
        assert_eq!(summary.total, 3);
    }

    #[test]
    fn records_sharing_a_name_accumulate() {
        let tuners = vec![
            tuner("shared", &["GR"], false, true, vec![user_with_stream(&[(50, 1)])]),
            tuner("shared", &["GR"], true, false, vec![]),
        ];

        let summary = TunerSummary::from_tuners(&tuners);

        assert_eq!(summary.users.len(), 1);
        assert_eq!(summary.users["shared"], 1);
        assert_eq!(summary.drops["shared"], 1);
        assert_eq!(summary.total, 2);
    }

    #[test]
    fn stream_totals_saturate_instead_of_overflowing() {
        let tuners = vec![tuner(
            "busy",
            &["BS"],
            false,
            true,
            vec![
                user_with_stream(&[(i64::MAX, i64::MAX)]),
                user_with_stream(&[(10, 1)]),
            ],
        )];

        let summary = TunerSummary::from_tuners(&tuners);

        assert_eq!(summary.packets["busy"], i64::MAX);
        assert_eq!(summary.drops["busy"], i64::MAX);
        assert_eq!(summary.users["busy"], 2);
    }

    #[tokio::test]
    async fn fault_and_remote_devices_are_counted() {
        let mut faulty = tuner("F", &["GR"], false, false, vec![]);
        faulty.is_fault = true;
        let mut remote = tuner("R", &["BS"], true, false, vec![]);
        remote.is_remote = true;
        let api = Arc::new(FakeApi {
            tuners: Some(vec![faulty, remote]),
            ..FakeApi::default()
        });

        let families = gather_from(TunersCollector::new(api)).await;

        assert_eq!(
            family(&families, "mirakurun_tuners_fault_tuner_devices").value_for(&[]),
            Some(1.0)
        );
        assert_eq!(
            family(&families, "mirakurun_tuners_remote_tuner_devices").value_for(&[]),
            Some(1.0)
        );
    }

    #[tokio::test]
    async fn fetch_failure_emits_nothing() {
        let api = Arc::new(FakeApi::default());

        let families = gather_from(TunersCollector::new(api)).await;

        assert!(families.is_empty());
    }
}
