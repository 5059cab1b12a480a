//! Inbound package collection.

use tds_channel::{Channel, DoneKind, Package, TransportError};

/// Why collection stopped early.
#[derive(Debug)]
pub(crate) enum StopError {
    /// An error done marker was read.
    TranFailed,
    /// The channel failed, or the stream ended.
    Transport(TransportError),
}

/// Packages read from one response.
///
/// `packages` is complete up to the stop point even when `stop` is set, so
/// error detail read before a failure remains available.
#[derive(Debug)]
pub(crate) struct Collected {
    pub packages: Vec<Package>,
    pub stop: Option<StopError>,
}

/// Read packages until `until` returns `true` or an error.
///
/// Every package read is kept, including the one that stopped collection.
pub(crate) async fn collect_until<C, F>(channel: &mut C, mut until: F) -> Collected
where
    C: Channel,
    F: FnMut(&Package) -> Result<bool, StopError>,
{
    let mut packages = Vec::new();
    loop {
        let package = match channel.next_package().await {
            Ok(package) => package,
            Err(e) => {
                return Collected {
                    packages,
                    stop: Some(StopError::Transport(e)),
                };
            }
        };

        let verdict = until(&package);
        packages.push(package);
        match verdict {
            Ok(false) => {}
            Ok(true) => return Collected { packages, stop: None },
            Err(e) => {
                return Collected {
                    packages,
                    stop: Some(e),
                };
            }
        }
    }
}

/// Stop on a final done marker; fail on an error done marker.
pub(crate) fn until_final(package: &Package) -> Result<bool, StopError> {
    let Package::Done(done) = package else {
        return Ok(false);
    };
    tracing::trace!(
        status = ?done.status,
        tran_state = ?done.tran_state,
        count = done.count,
        "done marker"
    );
    match done.kind() {
        DoneKind::Error => Err(StopError::TranFailed),
        DoneKind::Final => Ok(true),
        DoneKind::More => Ok(false),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tds_channel::{Done, DoneStatus, ExtendedError, LoginConfig, Row, RowFormat, TranState};

    struct ScriptChannel(VecDeque<Result<Package, TransportError>>);

    impl Channel for ScriptChannel {
        async fn login(&mut self, _config: &LoginConfig) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send_package(&mut self, _package: Package) -> Result<(), TransportError> {
            Ok(())
        }

        async fn next_package(&mut self) -> Result<Package, TransportError> {
            self.0.pop_front().unwrap_or(Err(TransportError::Eof))
        }

        fn reset(&mut self) {}
    }

    fn script(packages: Vec<Package>) -> ScriptChannel {
        ScriptChannel(packages.into_iter().map(Ok).collect())
    }

    #[tokio::test]
    async fn test_stops_at_final_marker() {
        let mut channel = script(vec![
            Package::RowFormat(RowFormat::from_names(["a"])),
            Package::Row(Row::default()),
            Package::Done(Done::more(1)),
            Package::Done(Done::completed(1)),
            Package::Row(Row::default()),
        ]);

        let collected = collect_until(&mut channel, until_final).await;
        assert!(collected.stop.is_none());
        assert_eq!(collected.packages.len(), 4);
        assert_eq!(channel.0.len(), 1);
    }

    #[tokio::test]
    async fn test_error_marker_keeps_packages() {
        let mut channel = script(vec![
            Package::Eed(ExtendedError::new(102, "Incorrect syntax")),
            Package::Done(Done::new(DoneStatus::ERROR, TranState::Completed, 0)),
        ]);

        let collected = collect_until(&mut channel, until_final).await;
        assert!(matches!(collected.stop, Some(StopError::TranFailed)));
        assert_eq!(collected.packages.len(), 2);
    }

    #[tokio::test]
    async fn test_end_of_stream_is_reported() {
        let mut channel = script(vec![Package::Done(Done::more(0))]);

        let collected = collect_until(&mut channel, until_final).await;
        match collected.stop {
            Some(StopError::Transport(e)) => assert!(e.is_eof()),
            other => panic!("unexpected stop: {other:?}"),
        }
        assert_eq!(collected.packages.len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_mid_stream() {
        let mut channel = ScriptChannel(VecDeque::from(vec![
            Ok(Package::RowFormat(RowFormat::from_names(["a"]))),
            Err(TransportError::Protocol("bad token".into())),
        ]));

        let collected = collect_until(&mut channel, until_final).await;
        assert!(matches!(
            collected.stop,
            Some(StopError::Transport(TransportError::Protocol(_)))
        ));
        assert_eq!(collected.packages.len(), 1);
    }
}
