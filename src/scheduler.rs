//! Composition root and fixed-period main loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Scheduler                            │
//! │                                                              │
//! │  every 100 ms:                                               │
//! │    NetworkManager::tick   ── link watch, NTP refresh         │
//! │    ProtocolHandler::tick  ── broker session, commands        │
//! │    Controller::tick       ── inputs, relays, LEDs, timers    │
//! │         │                                                    │
//! │         └── EventSink = ProtocolHandler::sink (publishes)    │
//! │                                                              │
//! │  RestartDue ──▶ RestartPort::restart                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The scheduler owns every component and lends the board, storage and
//! delay to the domain as a [`DeviceIo`] bundle per call.

use embedded_hal::delay::DelayNs;
use log::info;

use crate::app::controller::{Controller, ControllerStatus};
use crate::app::network::{NetworkEvent, NetworkManager};
use crate::app::ports::{
    Board, ConfigPort, ConnectivityPort, DeviceIo, MessageBus, RestartPort, TimeSource,
};
use crate::app::protocol::ProtocolHandler;
use crate::config::{MAIN_LOOP_PERIOD_MS, NetworkConfig, Timing};

pub struct Scheduler<B, W, T, H, S, D, R>
where
    B: MessageBus,
    W: ConnectivityPort,
    T: TimeSource,
{
    controller: Controller,
    network: NetworkManager<W, T>,
    protocol: ProtocolHandler<B>,
    network_config: NetworkConfig,
    board: H,
    storage: S,
    delay: D,
    restart: R,
    ticks: u64,
}

impl<B, W, T, H, S, D, R> Scheduler<B, W, T, H, S, D, R>
where
    B: MessageBus,
    W: ConnectivityPort,
    T: TimeSource,
    H: Board,
    S: ConfigPort,
    D: DelayNs,
    R: RestartPort,
{
    /// Wire the components together. Nothing touches hardware until
    /// [`setup`](Self::setup).
    pub fn new(
        network_config: NetworkConfig,
        timing: &Timing,
        wifi: W,
        time: T,
        bus: B,
        board: H,
        storage: S,
        delay: D,
        restart: R,
    ) -> Self {
        Self {
            controller: Controller::new(timing),
            network: NetworkManager::new(wifi, time, timing),
            protocol: ProtocolHandler::new(bus, &network_config, timing),
            network_config,
            board,
            storage,
            delay,
            restart,
            ticks: 0,
        }
    }

    /// Bring up the controller, the network and the broker, in that order.
    ///
    /// The controller goes first so the LED sweep can run while WiFi
    /// associates.
    pub fn setup(&mut self) {
        info!("Scheduler: starting doorbell broker...");

        let mut io = DeviceIo {
            board: &mut self.board,
            storage: &mut self.storage,
            delay: &mut self.delay,
        };
        self.controller.setup(&mut io);

        let controller = &mut self.controller;
        self.network.setup(
            &self.network_config.credentials,
            self.network_config.ntp_server,
            &mut || controller.startup_cycle(&mut io),
        );

        self.protocol.setup(&self.network);
        info!("Scheduler: setup complete, entering main loop");
    }

    /// One main-loop cycle, without the period delay.
    pub fn tick(&mut self) -> ControllerStatus {
        self.ticks += 1;

        if let Some(NetworkEvent::TimeAcquired) = self.network.tick(&mut self.controller) {
            self.protocol
                .log_action(&self.network, "Received first NTP time");
        }

        let mut io = DeviceIo {
            board: &mut self.board,
            storage: &mut self.storage,
            delay: &mut self.delay,
        };
        self.protocol
            .tick(&mut self.controller, &mut io, &self.network);

        let status = {
            let mut sink = self.protocol.sink(&self.network);
            self.controller.tick(&mut io, &mut sink, &self.network)
        };

        if status == ControllerStatus::RestartDue {
            self.restart.restart();
        }
        status
    }

    /// Run forever at the main-loop period.
    pub fn run(&mut self) -> ! {
        loop {
            self.delay.delay_ms(MAIN_LOOP_PERIOD_MS);
            self.tick();
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Main-loop cycles since setup.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn network(&self) -> &NetworkManager<W, T> {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut NetworkManager<W, T> {
        &mut self.network
    }

    pub fn protocol(&self) -> &ProtocolHandler<B> {
        &self.protocol
    }

    pub fn protocol_mut(&mut self) -> &mut ProtocolHandler<B> {
        &mut self.protocol
    }

    pub fn board(&self) -> &H {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut H {
        &mut self.board
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn restart_port(&self) -> &R {
        &self.restart
    }
}
