//! `lidar-hub` turns a spinning 2-D rangefinder's raw text stream into
//! 360-degree rotations, packs them into a compact bitstream, and
//! broadcasts the decoded readings to monitor subscribers over TCP.
//!
//! The pipeline is a straight line from driver subprocess to subscriber
//! socket: [`line_source`] reads the sensor driver's stdout, [`parser`]
//! turns each line into a [`types::Measurement`], [`segmenter`] groups
//! measurements into a [`types::Rotation`] and decides whether it's worth
//! keeping, [`codec`] packs an accepted rotation into bytes (and unpacks
//! it again on the server side), [`validator`] filters the decoded
//! samples, and [`fanout`] (backed by [`registry`]) gets them to whoever
//! is listening. [`ingest_client`] and [`ingest_server`] wire the client-
//! and server-side halves of this together over a TCP connection.

pub mod codec;
pub mod error;
pub mod fanout;
pub mod ingest_client;
pub mod ingest_server;
pub mod line_source;
pub mod parser;
pub mod registry;
pub mod segmenter;
pub mod types;
pub mod validator;

pub use error::{DecodeError, EncodeError, IngestClientError, IngestServerError, LineSourceError, RejectReason};
pub use types::{DecodedFrame, DecodedSample, Measurement, Rotation, RotationPacket};
