//! SSH channel pump: forwards one exec channel's output to its
//! [`RemoteProcess`](crate::transport::RemoteProcess) and applies kill
//! requests.

use russh::client::Msg;
use russh::{Channel, ChannelMsg, Sig};
use tracing::{debug, trace};

use crate::transport::{ExitStatus, ProcessIo, ProcessOutput};

/// Runs until the channel closes or a kill is requested, then reports the
/// exit status as the final event.
pub(crate) async fn channel_pump(mut channel: Channel<Msg>, io: ProcessIo) {
    let ProcessIo { output, mut kill } = io;
    let mut status = ExitStatus::Unknown;

    loop {
        tokio::select! {
            biased;
            request = &mut kill => {
                if request.is_ok() {
                    debug!("sending KILL to remote process");
                    if let Err(e) = channel.signal(Sig::KILL).await {
                        debug!(error = %e, "failed to signal remote process");
                    }
                    status = ExitStatus::Signal("KILL".into());
                }
                let _ = channel.close().await;
                break;
            }
            msg = channel.wait() => match msg {
                Some(ChannelMsg::Data { data }) => {
                    if output.send(ProcessOutput::Stdout(data.to_vec())).await.is_err() {
                        let _ = channel.close().await;
                        return;
                    }
                }
                Some(ChannelMsg::ExtendedData { data, ext: 1 }) => {
                    if output.send(ProcessOutput::Stderr(data.to_vec())).await.is_err() {
                        let _ = channel.close().await;
                        return;
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    status = ExitStatus::Code(exit_status);
                }
                Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                    status = ExitStatus::Signal(signal_label(&signal_name));
                }
                Some(ChannelMsg::Close) | None => break,
                Some(other) => trace!(?other, "ignoring channel message"),
            }
        }
    }

    let _ = output.send(ProcessOutput::Exited(status)).await;
}

fn signal_label(sig: &Sig) -> String {
    match sig {
        Sig::Custom(name) => name.clone(),
        other => format!("{other:?}"),
    }
}
