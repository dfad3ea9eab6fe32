/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tag numbers the toolkit reads or rewrites.

/// Account.
pub const ACCOUNT: u32 = 1;
/// BeginString.
pub const BEGIN_STRING: u32 = 8;
/// BodyLength.
pub const BODY_LENGTH: u32 = 9;
/// CheckSum.
pub const CHECKSUM: u32 = 10;
/// ClOrdID.
pub const CL_ORD_ID: u32 = 11;
/// HandlInst.
pub const HANDL_INST: u32 = 21;
/// MsgSeqNum.
pub const MSG_SEQ_NUM: u32 = 34;
/// MsgType.
pub const MSG_TYPE: u32 = 35;
/// OrderQty.
pub const ORDER_QTY: u32 = 38;
/// OrdType.
pub const ORD_TYPE: u32 = 40;
/// Price.
pub const PRICE: u32 = 44;
/// SenderCompID.
pub const SENDER_COMP_ID: u32 = 49;
/// SendingTime.
pub const SENDING_TIME: u32 = 52;
/// Side.
pub const SIDE: u32 = 54;
/// Symbol.
pub const SYMBOL: u32 = 55;
/// TargetCompID.
pub const TARGET_COMP_ID: u32 = 56;
/// TargetSubID.
pub const TARGET_SUB_ID: u32 = 57;
/// Text.
pub const TEXT: u32 = 58;
/// TimeInForce.
pub const TIME_IN_FORCE: u32 = 59;
/// TransactTime.
pub const TRANSACT_TIME: u32 = 60;
/// EncryptMethod.
pub const ENCRYPT_METHOD: u32 = 98;
/// HeartBtInt.
pub const HEART_BT_INT: u32 = 108;
/// TestReqID.
pub const TEST_REQ_ID: u32 = 112;
/// ResetSeqNumFlag.
pub const RESET_SEQ_NUM_FLAG: u32 = 141;
/// SenderLocationID.
pub const SENDER_LOCATION_ID: u32 = 142;
/// Username.
pub const USERNAME: u32 = 553;
/// Password.
pub const PASSWORD: u32 = 554;
/// NextExpectedMsgSeqNum.
pub const NEXT_EXPECTED_MSG_SEQ_NUM: u32 = 789;
/// NewPassword.
pub const NEW_PASSWORD: u32 = 925;
/// DefaultApplExtID.
pub const DEFAULT_APPL_EXT_ID: u32 = 1407;
