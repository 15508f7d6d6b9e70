use crate::{CameraConfig, CameraConnection, CameraStatus, OpContext, Result};
use tokio_stream::wrappers::WatchStream;
use visca_protocol::{commands, CameraVersion, FocusMode, InquiryResponse, PowerMode, Response};

/// High-level handle for one camera: named operations over a managed
/// [`CameraConnection`].
pub struct Camera {
    connection: CameraConnection,
    name: String,
}

impl Camera {
    pub fn new(config: CameraConfig) -> Result<Self> {
        let name = config.display_name();
        Ok(Self {
            connection: CameraConnection::open(config)?,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying connection, for queue-level control.
    pub fn connection(&self) -> &CameraConnection {
        &self.connection
    }

    /// Waits until the camera is connected.
    pub async fn connect(&self, ctx: OpContext) -> Result {
        self.connection.connect(ctx).await
    }

    /// Drives pan and tilt to the home position.
    pub async fn home(&self, ctx: OpContext) -> Result<Response> {
        self.connection.send(commands::HOME, ctx).await
    }

    /// Resets pan and tilt, recalibrating the motors.
    pub async fn reset(&self, ctx: OpContext) -> Result<Response> {
        self.connection.send(commands::RESET, ctx).await
    }

    pub async fn power_on(&self, ctx: OpContext) -> Result<Response> {
        self.connection.send(commands::POWER_ON, ctx).await
    }

    pub async fn power_off(&self, ctx: OpContext) -> Result<Response> {
        self.connection.send(commands::POWER_OFF, ctx).await
    }

    /// Drops everything queued and cancels the command executing on
    /// `socket`.
    pub async fn cancel(&self, socket: u8) -> Result<Response> {
        self.connection.cancel_all(socket).await
    }

    pub async fn power(&self, ctx: OpContext) -> Result<InquiryResponse<PowerMode>> {
        self.connection
            .send_inquiry(&commands::INQUIRE_POWER, ctx)
            .await
    }

    /// Current zoom position, scaled to `0.0..=1.0`.
    pub async fn zoom(&self, ctx: OpContext) -> Result<InquiryResponse<f64>> {
        self.connection
            .send_inquiry(&commands::INQUIRE_ZOOM, ctx)
            .await
    }

    pub async fn version(&self, ctx: OpContext) -> Result<InquiryResponse<CameraVersion>> {
        self.connection
            .send_inquiry(&commands::INQUIRE_VERSION, ctx)
            .await
    }

    pub async fn focus_mode(&self, ctx: OpContext) -> Result<InquiryResponse<FocusMode>> {
        self.connection
            .send_inquiry(&commands::INQUIRE_FOCUS_MODE, ctx)
            .await
    }

    /// Stream of status snapshots, starting with the current one.
    pub fn status_stream(&self) -> WatchStream<CameraStatus> {
        WatchStream::new(self.connection.status())
    }

    pub fn current_status(&self) -> CameraStatus {
        self.connection.current_status()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }
}
